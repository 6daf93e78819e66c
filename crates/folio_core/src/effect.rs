use crate::{Epoch, Generation, NavigationTarget, RequestId, Scope, SubmitTurn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartExtraction {
        generation: Generation,
        document_id: String,
        force: bool,
    },
    /// Stop reading the stream of this attempt.
    CancelExtraction { generation: Generation },
    /// Mount (or switch to) the viewer for this document.
    ShowDocument { document_id: String },
    /// Call the mounted viewer's navigation handle.
    JumpToPage(NavigationTarget),
    ArmNavigationFallback { request_id: RequestId },
    LoadSessions { epoch: Epoch, scope: Scope },
    LoadConversation {
        epoch: Epoch,
        conversation_id: String,
    },
    SubmitQuestion(SubmitTurn),
    DeleteSession { conversation_id: String },
    SubmitFeedback {
        record_id: String,
        rating: Option<u8>,
        text: String,
    },
}
