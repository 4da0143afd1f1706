use std::path::PathBuf;

/// Hierarchical separators recognised in class names: `\` for namespaces and
/// `_` for the legacy PEAR convention.
pub const CLASS_SEPARATORS: [char; 2] = ['\\', '_'];

pub const DEFAULT_EXTENSION: &str = "php";

/// Maps `Name\Space_Sub` to `Name/Space/Sub.<ext>` using the platform separator.
///
/// Runs of separators collapse into one, matching what the filesystem does
/// with `a//b`. Returns `None` for names that can never name a file below a
/// root directory (empty names, `.`/`..` segments, embedded `/` or NUL).
pub fn class_name_to_relative_path(class_name: &str, extension: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = class_name
        .split(CLASS_SEPARATORS)
        .filter(|s| !s.is_empty())
        .collect();

    if !segments.iter().all(|s| is_path_segment(s)) {
        return None;
    }

    let (last, rest) = segments.split_last()?;
    let mut path: PathBuf = rest.iter().collect();
    path.push(format!("{last}.{extension}"));
    Some(path)
}

fn is_path_segment(segment: &str) -> bool {
    segment != "." && segment != ".." && !segment.contains(['/', '\0'])
}

/// Lookup key for class tables. PHP class names are case-insensitive and may
/// be written fully qualified with a leading `\`.
pub fn class_key(class_name: &str) -> String {
    class_name.trim_start_matches('\\').to_ascii_lowercase()
}

/// Cleans up a class name pasted from source, e.g. `use Foo\Bar;`.
pub fn normalize_class_name(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("use ") {
        s = rest.trim();
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    s.strip_prefix('\\').map(str::to_string).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn translates_namespace_and_underscore_separators() {
        let path = class_name_to_relative_path("Name\\Space_Sub", "php").unwrap();
        assert_eq!(path, Path::new("Name").join("Space").join("Sub.php"));
    }

    #[test]
    fn plain_name_maps_to_single_file() {
        assert_eq!(
            class_name_to_relative_path("Foo", "php"),
            Some(PathBuf::from("Foo.php"))
        );
    }

    #[test]
    fn repeated_and_leading_separators_collapse() {
        let path = class_name_to_relative_path("\\Vendor\\\\Pkg__Thing", "inc").unwrap();
        assert_eq!(path, Path::new("Vendor").join("Pkg").join("Thing.inc"));
    }

    #[test]
    fn rejects_names_that_escape_the_root() {
        assert_eq!(class_name_to_relative_path("..\\Secret", "php"), None);
        assert_eq!(class_name_to_relative_path("a/b", "php"), None);
        assert_eq!(class_name_to_relative_path("", "php"), None);
        assert_eq!(class_name_to_relative_path("\\_", "php"), None);
    }

    #[test]
    fn class_key_ignores_case_and_leading_backslash() {
        assert_eq!(class_key("\\App\\Model\\User"), class_key("app\\model\\USER"));
    }

    #[test]
    fn normalize_class_name_strips_use_whitespace_and_semicolon() {
        assert_eq!(
            normalize_class_name("  use \\App\\Http\\ Controller ;"),
            "App\\Http\\Controller"
        );
        assert_eq!(normalize_class_name("Zend_Db_Table"), "Zend_Db_Table");
    }
}
