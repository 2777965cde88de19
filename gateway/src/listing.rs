use std::fmt::Write;

use nearfs_castore::Directory;

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Renders the listing of a directory served at `url_path`, which ends
/// with a `/`. Entries are listed in the order they're stored in.
pub fn render(url_path: &str, directory: &Directory) -> String {
    let url_path = html_escape(url_path);

    let mut items = String::new();
    for entry in directory.entries() {
        let name = html_escape(entry.name());
        // writing to a String can't fail.
        let _ = writeln!(
            items,
            "            <li><a href=\"{url_path}{name}\">{name}</a></li>"
        );
    }

    format!(
        "<html>
    <head>
        <title>Index of {url_path}</title>
    </head>
    <body>
        <h1>Index of {url_path}</h1>
        <ul>
{items}        </ul>
    </body>
</html>
"
    )
}
