//! Error types for rendering sessions.

use crate::ast::NodeType;
use crate::handler::ProviderKind;

/// Error raised by a [`MarkupSink`](crate::MarkupSink).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SinkError {
    /// XML serialization error.
    #[error("XML write error")]
    Xml(#[from] quick_xml::Error),

    /// I/O error from the underlying writer.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The sink refused the event.
    #[error("sink rejected event: {0}")]
    Rejected(String),
}

/// Error that aborts a render session.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The output sink rejected an event.
    #[error("failed to write markup event")]
    WriteFailure(#[from] SinkError),

    /// Traversal reached a node type no provider renders.
    #[error("no renderer configured for {0}")]
    NoHandlerForNodeType(NodeType),

    /// Provider delegate declarations form a cycle.
    #[error("renderer providers have cyclic delegates: {}", format_kinds(.0))]
    ProviderCycle(Vec<ProviderKind>),
}

fn format_kinds(kinds: &[ProviderKind]) -> String {
    kinds
        .iter()
        .map(ProviderKind::name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RenderError::NoHandlerForNodeType(NodeType::Custom("callout"));
        assert_eq!(err.to_string(), "no renderer configured for callout");

        let err = RenderError::ProviderCycle(vec![ProviderKind::new("a"), ProviderKind::new("b")]);
        assert_eq!(
            err.to_string(),
            "renderer providers have cyclic delegates: a, b"
        );

        let err = RenderError::from(SinkError::Rejected("closed".to_owned()));
        assert!(matches!(err, RenderError::WriteFailure(_)));
    }
}
