use mime_guess::mime;

pub const DEFAULT: &str = "application/octet-stream";
pub const HTML: &str = "text/html; charset=utf-8";

/// Guesses the content type from the extension of a file name.
/// Text types without an explicit charset are marked as UTF-8.
pub fn from_name(name: &str) -> String {
    let guess = mime_guess::from_path(name).first_or_octet_stream();

    if guess.type_() == mime::TEXT && guess.get_param(mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", guess)
    } else {
        guess.to_string()
    }
}
