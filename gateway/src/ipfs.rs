use axum::body::Body;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cid::Cid;
use nearfs_castore::assembler::assemble;
use nearfs_castore::blockservice::BlockService;
use nearfs_castore::resolver::load_node;
use nearfs_castore::{resolve, Directory, Node, Resolved};
use tracing::{instrument, warn};

use crate::{listing, mime, AppState};

const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "not found");
const INTERNAL_ERROR: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "internal error");

type HandlerResult = Result<Response, (StatusCode, &'static str)>;

/// Serves `/ipfs/{cid}/{path...}`.
#[instrument(skip(block_service, uri))]
pub async fn get(
    Path(rest): Path<String>,
    OriginalUri(uri): OriginalUri,
    State(AppState { block_service }): State<AppState>,
) -> HandlerResult {
    let rest = rest.strip_prefix('/').unwrap_or(&rest);
    let (cid_str, path) = rest.split_once('/').unwrap_or((rest, ""));
    let trailing_slash = rest.ends_with('/');

    let root = Cid::try_from(cid_str).map_err(|e| {
        warn!(err=%e, "unable to parse cid");
        (StatusCode::BAD_REQUEST, "invalid cid")
    })?;

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resolved = resolve(&block_service, &root, &segments)
        .await
        .map_err(|e| {
            warn!(err=%e, "unable to resolve path");
            INTERNAL_ERROR
        })?
        .ok_or(NOT_FOUND)?;

    match resolved {
        Resolved::Directory { directory, .. } => {
            if !trailing_slash {
                return redirect(&format!("{}/", uri.path()));
            }

            serve_directory(&block_service, &directory, uri.path()).await
        }
        Resolved::File { cid, node } => {
            let data = assemble(&block_service, &node)
                .await
                .map_err(|e| {
                    warn!(err=%e, "unable to assemble file");
                    INTERNAL_ERROR
                })?
                .ok_or(NOT_FOUND)?;

            let content_type = segments
                .last()
                .map_or_else(|| mime::DEFAULT.to_string(), |name| mime::from_name(name));

            file_response(&cid, &content_type, data)
        }
    }
}

/// Serves the `index.html` inside a directory if there is one, otherwise a
/// listing of it.
/// An `index.html` that is not a file is ignored. One whose block, or any
/// of its chunks, is missing is not found.
async fn serve_directory<BS>(
    block_service: &BS,
    directory: &Directory,
    url_path: &str,
) -> HandlerResult
where
    BS: BlockService + ?Sized,
{
    if let Some(entry) = directory.get("index.html") {
        let node = load_node(block_service, entry.cid())
            .await
            .map_err(|e| {
                warn!(err=%e, "unable to load index.html");
                INTERNAL_ERROR
            })?
            .ok_or(NOT_FOUND)?;

        if let Node::File(file) = node {
            let data = assemble(block_service, &file)
                .await
                .map_err(|e| {
                    warn!(err=%e, "unable to assemble index.html");
                    INTERNAL_ERROR
                })?
                .ok_or(NOT_FOUND)?;

            return file_response(entry.cid(), mime::HTML, data);
        }
    }

    Ok((
        [(header::CONTENT_TYPE, mime::HTML)],
        listing::render(url_path, directory),
    )
        .into_response())
}

fn redirect(location: &str) -> HandlerResult {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, location)
        .header(header::CONTENT_TYPE, mime::HTML)
        .body(Body::from(format!(
            "<a href=\"{}\">Moved Permanently</a>.",
            location
        )))
        .map_err(|e| {
            warn!(err=%e, "unable to build redirect");
            INTERNAL_ERROR
        })
}

fn file_response(cid: &Cid, content_type: &str, data: Bytes) -> HandlerResult {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .header(header::ETAG, format!("\"{}\"", cid))
        .body(Body::from(data))
        .map_err(|e| {
            warn!(err=%e, "unable to build response");
            INTERNAL_ERROR
        })
}
