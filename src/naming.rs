//! Object key parsing.
//!
//! Bucket objects are addressed by a flat key that uses `/` as a directory
//! separator by convention. The catalog identifies an image by the last
//! component (`name`) and everything before it (`path`):
//!
//! | Key | name | path |
//! |---|---|---|
//! | `2014/misool/DSC_1378.jpg` | `DSC_1378.jpg` | `2014/misool` |
//! | `DSC_1378.jpg` | `DSC_1378.jpg` | `` |
//! | `/DSC_1378.jpg` | `DSC_1378.jpg` | `/` |
//! | `2014/misool/` | `misool` | `2014` |
//! | `2014//DSC.jpg` | `DSC.jpg` | `2014/` |
//!
//! Trailing separators of the key are ignored. Only the single separator
//! before `name` is dropped from `path`; repeated ones are kept as written.

/// The catalog identity of an object: directory and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Last key component, extension included.
    pub name: String,
    /// Everything before the separator that precedes `name`.
    pub path: String,
}

/// Split an object key into directory path and file name.
pub fn parse_object_key(key: &str) -> ObjectPath {
    let trimmed = key.trim_end_matches('/');
    if trimmed.is_empty() {
        // "" or only separators
        let path = if key.is_empty() { "" } else { "/" };
        return ObjectPath {
            name: String::new(),
            path: path.to_string(),
        };
    }

    match trimmed.rfind('/') {
        Some(pos) => {
            let dir = &trimmed[..pos];
            ObjectPath {
                name: trimmed[pos + 1..].to_string(),
                path: (if dir.is_empty() { "/" } else { dir }).to_string(),
            }
        }
        None => ObjectPath {
            name: trimmed.to_string(),
            path: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(key: &str) -> (String, String) {
        let p = parse_object_key(key);
        (p.name, p.path)
    }

    #[test]
    fn nested_key() {
        let p = parse_object_key("2014/misool/DSC_1378.jpg");
        assert_eq!(p.name, "DSC_1378.jpg");
        assert_eq!(p.path, "2014/misool");
    }

    #[test]
    fn top_level_key() {
        assert_eq!(split("DSC_1378.jpg"), ("DSC_1378.jpg".into(), "".into()));
    }

    #[test]
    fn rooted_key() {
        assert_eq!(split("/DSC_1378.jpg"), ("DSC_1378.jpg".into(), "/".into()));
        assert_eq!(split("//DSC_1378.jpg"), ("DSC_1378.jpg".into(), "/".into()));
    }

    #[test]
    fn trailing_separator_ignored() {
        assert_eq!(split("2014/misool/"), ("misool".into(), "2014".into()));
    }

    #[test]
    fn repeated_separators_kept_in_path() {
        assert_eq!(split("2014//DSC.jpg"), ("DSC.jpg".into(), "2014/".into()));
        assert_eq!(split("2014//misool//"), ("misool".into(), "2014/".into()));
    }

    #[test]
    fn empty_and_separator_only() {
        assert_eq!(split(""), ("".into(), "".into()));
        assert_eq!(split("///"), ("".into(), "/".into()));
    }

    #[test]
    fn keeps_unicode_and_spaces() {
        assert_eq!(
            split("2019/Nusa Penida/Mola mola été.jpg"),
            ("Mola mola été.jpg".into(), "2019/Nusa Penida".into())
        );
    }
}
