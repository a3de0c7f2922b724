use std::ffi::OsString;
use std::path::{Path, PathBuf};

const HTML_EXTENSION: &str = "html";

/// Replaces characters that cannot appear in a file name
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "thread".to_string()
    } else {
        cleaned
    }
}

/// Resolves where the rendered page is written
///
/// - no path: `{title}.html` in the working directory
/// - an existing directory: `{dir}/{title}.html`
/// - anything else: the path itself, with `.html` appended when missing
pub fn determine_output_path(output: Option<&Path>, title: &str) -> PathBuf {
    let file_name = format!("{}.{}", sanitize_file_name(title), HTML_EXTENSION);

    match output {
        None => PathBuf::from(file_name),
        Some(dir) if dir.is_dir() => dir.join(file_name),
        Some(path) => {
            let has_extension = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(HTML_EXTENSION));
            if has_extension {
                path.to_path_buf()
            } else {
                let mut with_extension = OsString::from(path.as_os_str());
                with_extension.push(".");
                with_extension.push(HTML_EXTENSION);
                PathBuf::from(with_extension)
            }
        }
    }
}
