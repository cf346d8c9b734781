pub mod shell;
pub mod template;
pub mod validation;
