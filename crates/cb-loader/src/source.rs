use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cb_core::{ChatBrainError, ErrorKind};
use walkdir::WalkDir;

pub fn resolve_scripts_dir(scripts_dir: &Path) -> Result<PathBuf, ChatBrainError> {
    let absolute = if scripts_dir.is_absolute() {
        scripts_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|error| ChatBrainError::new(ErrorKind::Io, "LOAD_CWD", error.to_string()))?
            .join(scripts_dir)
    };

    if !absolute.exists() {
        return Err(ChatBrainError::load(
            "LOAD_DIR_NOT_FOUND",
            format!("Script folder does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(ChatBrainError::load(
            "LOAD_DIR_NOT_DIR",
            format!("Script folder is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

pub fn is_script_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("yaml" | "yml")
    )
}

/// Reads the script documents sitting directly in `scripts_dir`, keyed by
/// file name.
pub fn read_documents_from_dir(
    scripts_dir: &Path,
) -> Result<BTreeMap<String, String>, ChatBrainError> {
    let mut documents = BTreeMap::new();

    for entry in WalkDir::new(scripts_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() || !is_script_document(entry.path()) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let content = fs::read_to_string(entry.path()).map_err(|error| {
            ChatBrainError::load_in(
                "LOAD_READ",
                format!("Failed to read {}: {}", file_name, error),
                file_name.clone(),
            )
        })?;
        documents.insert(file_name, content);
    }

    if documents.is_empty() {
        return Err(ChatBrainError::load(
            "LOAD_EMPTY_DIR",
            format!("No .yaml/.yml documents under {}", scripts_dir.display()),
        ));
    }

    Ok(documents)
}

#[cfg(test)]
mod source_tests {
    use super::*;
    use crate::loader_test_support::*;

    #[test]
    fn script_document_extensions() {
        assert!(is_script_document(Path::new("a.yaml")));
        assert!(is_script_document(Path::new("dir/a.yml")));
        assert!(!is_script_document(Path::new("a.yaml.bak")));
        assert!(!is_script_document(Path::new("yaml")));
    }

    #[test]
    fn relative_dirs_resolve_against_cwd() {
        let cwd = std::env::current_dir().expect("cwd");
        let root = temp_path("relative-root");
        fs::create_dir_all(root.join("child")).expect("child");

        std::env::set_current_dir(&root).expect("switch cwd");
        let resolved = resolve_scripts_dir(Path::new("child"));
        std::env::set_current_dir(cwd).expect("restore cwd");
        assert!(resolved.expect("relative dir should resolve").ends_with("child"));
    }

    #[test]
    fn read_documents_keys_by_file_name() {
        let root = temp_path("read-docs");
        write_file(&root.join("z.yaml"), "intents: []");
        write_file(&root.join("a.yaml"), "intents: []");
        let documents = read_documents_from_dir(&root).expect("read");
        assert_eq!(
            documents.keys().cloned().collect::<Vec<_>>(),
            vec!["a.yaml".to_string(), "z.yaml".to_string()]
        );
    }
}
