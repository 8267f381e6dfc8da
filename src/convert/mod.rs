// src/convert/mod.rs

//! Conversion command construction.
//!
//! Argument templates come from `[convert]` in the config and contain
//! `{input}`, `{output}` and `{url}` placeholders. Rendering is plain text
//! substitution; each rendered argument goes to the subprocess verbatim, so
//! file names and URLs are never shell-interpreted.

/// Substitute `{name}` placeholders in an argument template.
///
/// Unknown placeholders are left as-is; validation catches templates that
/// are missing the placeholders they need.
pub fn render_args(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            let mut rendered = arg.clone();
            for (name, value) in vars {
                rendered = rendered.replace(&format!("{{{name}}}"), value);
            }
            rendered
        })
        .collect()
}

/// Derive the output file name for a conversion: the source name's stem plus
/// the configured extension.
pub fn output_name(source_name: &str, ext: &str) -> String {
    let stem = match source_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source_name,
    };
    format!("{stem}.{ext}")
}

/// Derive a source name from a URL: its last path segment, or `document`
/// when the URL has no usable segment.
pub fn name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let without_scheme = trimmed.split_once("://").map_or(trimmed, |(_, rest)| rest);
    let segment = without_scheme
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split(['?', '#'])
        .next()
        .unwrap_or("");

    if segment.is_empty() || !without_scheme.contains('/') {
        "document".to_string()
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn renders_placeholders_verbatim() {
        let args = render_args(
            &template(&["{input}", "-o", "{output}", "--quiet"]),
            &[("input", "in.md"), ("output", "out.pdf")],
        );
        assert_eq!(args, vec!["in.md", "-o", "out.pdf", "--quiet"]);
    }

    #[test]
    fn renders_placeholder_embedded_in_argument() {
        let args = render_args(
            &template(&["--out={output}"]),
            &[("output", "a b.pdf")],
        );
        // No shell: spaces survive as part of a single argument.
        assert_eq!(args, vec!["--out=a b.pdf"]);
    }

    #[test]
    fn output_name_replaces_extension() {
        assert_eq!(output_name("report.md", "pdf"), "report.pdf");
        assert_eq!(output_name("archive.tar.gz", "pdf"), "archive.tar.pdf");
        assert_eq!(output_name("noext", "pdf"), "noext.pdf");
        assert_eq!(output_name(".hidden", "pdf"), ".hidden.pdf");
    }

    #[test]
    fn name_from_url_takes_last_segment() {
        assert_eq!(name_from_url("https://example.com/docs/page.html"), "page.html");
        assert_eq!(name_from_url("https://example.com/docs/"), "docs");
        assert_eq!(name_from_url("https://example.com"), "document");
        assert_eq!(name_from_url("https://example.com/a?x=1"), "a");
    }
}
