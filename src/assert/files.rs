use crate::generate::FileTree;

/// Expected paths absent from the tree, in declaration order.
pub fn missing_files(expected: &[String], tree: &FileTree) -> Vec<String> {
    expected
        .iter()
        .filter(|path| !tree.contains_key(path.as_str()))
        .cloned()
        .collect()
}
