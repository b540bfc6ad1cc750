use crate::domain::DomainError;

/// Port for exporting text to the system clipboard.
///
/// Used to hand user-visible error reports to support.
pub trait Clipboard: Send + Sync {
    fn copy_text(&self, text: &str) -> Result<(), DomainError>;
}
