use similar::TextDiff;

/// Unified diff from the page on disk to the freshly rendered one, or `None`
/// when they match.
pub fn page_diff(on_disk: &str, rendered: &str, path: &str) -> Option<String> {
    if on_disk == rendered {
        return None;
    }

    let diff = TextDiff::from_lines(on_disk, rendered);
    let mut output = Vec::new();
    let header_old = format!("a/{path}");
    let header_new = format!("b/{path}");

    diff.unified_diff()
        .context_radius(2)
        .header(&header_old, &header_new)
        .to_writer(&mut output)
        .expect("writing diff to a Vec never fails");

    Some(String::from_utf8_lossy(&output).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_pages_have_no_diff() {
        assert!(page_diff("Intro\n", "Intro\n", "tour.gen.rst").is_none());
    }

    #[test]
    fn changed_output_block_shows_up() {
        let diff = page_diff("  Hi\n", "  Hello\n", "tour.gen.rst").unwrap();
        assert!(diff.starts_with("--- a/tour.gen.rst"));
        assert!(diff.contains("-  Hi"));
        assert!(diff.contains("+  Hello"));
    }
}
