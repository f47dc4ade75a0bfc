use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{CbToolError, TestCase, TESTCASE_SCHEMA_V1};

pub const TESTCASE_FILE_NAME: &str = "testcase.json";

pub fn read_test_case(case_path: &Path) -> Result<TestCase, CbToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| CbToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| CbToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(CbToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}

/// Case folders directly under `root` that carry a testcase file, sorted.
pub fn discover_cases(root: &Path) -> Result<Vec<PathBuf>, CbToolError> {
    let mut folders = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .filter(|path| path.join(TESTCASE_FILE_NAME).is_file())
        .collect::<Vec<_>>();
    folders.sort();

    if folders.is_empty() {
        return Err(CbToolError::NoCases {
            path: root.to_path_buf(),
            file_name: TESTCASE_FILE_NAME.to_string(),
        });
    }
    Ok(folders)
}

#[cfg(test)]
mod source_tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should move forward")
            .as_nanos();
        std::env::temp_dir().join(format!("cb-tool-source-{}-{}", name, nanos))
    }

    fn write_file(path: &Path, content: &str) {
        let parent = path.parent().expect("path should have parent");
        fs::create_dir_all(parent).expect("parent dir should be created");
        fs::write(path, content).expect("file should be written");
    }

    #[test]
    fn read_test_case_checks_schema_version() {
        let root = temp_dir("schema");
        let good = root.join("good.json");
        write_file(&good, r#"{"schemaVersion":"cb-tool-case.v1","turns":[]}"#);
        assert!(read_test_case(&good).expect("case").turns.is_empty());

        let bad = root.join("bad.json");
        write_file(&bad, r#"{"schemaVersion":"chat-case.v0"}"#);
        let error = read_test_case(&bad).expect_err("schema mismatch");
        assert!(matches!(error, CbToolError::InvalidSchemaVersion { .. }));

        let broken = root.join("broken.json");
        write_file(&broken, "{");
        assert!(matches!(
            read_test_case(&broken).expect_err("invalid json"),
            CbToolError::ParseCase { .. }
        ));
        assert!(matches!(
            read_test_case(&root.join("missing.json")).expect_err("missing file"),
            CbToolError::ReadFile { .. }
        ));
    }

    #[test]
    fn discover_cases_lists_folders_with_testcase() {
        let root = temp_dir("discover");
        write_file(&root.join("02-b").join(TESTCASE_FILE_NAME), "{}");
        write_file(&root.join("01-a").join(TESTCASE_FILE_NAME), "{}");
        write_file(&root.join("03-no-case").join("a.yaml"), "intents: []");
        write_file(&root.join(TESTCASE_FILE_NAME), "{}");

        let cases = discover_cases(&root).expect("cases");
        let names = cases
            .iter()
            .map(|path| path.file_name().expect("name").to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["01-a", "02-b"]);

        let empty = temp_dir("discover-empty");
        fs::create_dir_all(&empty).expect("dir");
        assert!(matches!(
            discover_cases(&empty).expect_err("no cases"),
            CbToolError::NoCases { .. }
        ));
    }
}
