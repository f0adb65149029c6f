/// Filesystem JSONL transport.
pub mod fs;
