pub mod preparer;
pub mod template;
