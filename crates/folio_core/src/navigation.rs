/// Sequence number of a navigation request; later requests carry larger ids.
pub type RequestId = u64;

/// "Show page `page_index` of `document_id`", with a zero-based page index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub document_id: String,
    pub page_index: u32,
}

impl NavigationTarget {
    pub fn new(document_id: impl Into<String>, page_index: u32) -> Self {
        Self {
            document_id: document_id.into(),
            page_index,
        }
    }

    /// Builds a target from a one-based page number as shown to users.
    /// Page 0 is treated as the first page.
    pub fn from_page_number(document_id: impl Into<String>, page_number: u32) -> Self {
        Self::new(document_id, page_number.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNavigation {
    pub target: NavigationTarget,
    pub issued_at: RequestId,
}

/// Instructions from the router to whoever hosts the viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    /// Call the mounted viewer's handle now.
    Jump(NavigationTarget),
    /// Bring up the viewer for this document; it acknowledges with a mount.
    ShowDocument { document_id: String },
    /// Start the single-shot fallback timer for this request.
    ArmFallback { request_id: RequestId },
}

/// Routes page requests to the mounted viewer, or parks them until the right
/// viewer mounts. At most one request is parked; the newest one wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationRouter {
    active_document: Option<String>,
    mounted_document: Option<String>,
    pending: Option<PendingNavigation>,
    last_request: RequestId,
}

impl NavigationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, document_id: &str, page_number: u32) -> Vec<NavCommand> {
        self.last_request += 1;
        let request_id = self.last_request;
        let target = NavigationTarget::from_page_number(document_id, page_number);
        self.active_document = Some(document_id.to_string());

        // A parked request means a viewer switch is already under way, so the
        // mounted viewer cannot be trusted to stay.
        if self.pending.is_none() && self.mounted_document.as_deref() == Some(document_id) {
            return vec![NavCommand::Jump(target)];
        }

        self.pending = Some(PendingNavigation {
            target,
            issued_at: request_id,
        });
        vec![
            NavCommand::ShowDocument {
                document_id: document_id.to_string(),
            },
            NavCommand::ArmFallback { request_id },
        ]
    }

    /// A viewer bound to `document_id` finished mounting.
    pub fn viewer_mounted(&mut self, document_id: &str) -> Vec<NavCommand> {
        self.mounted_document = Some(document_id.to_string());
        match self.pending.take() {
            Some(pending) if pending.target.document_id == document_id => {
                vec![NavCommand::Jump(pending.target)]
            }
            other => {
                self.pending = other;
                Vec::new()
            }
        }
    }

    pub fn viewer_unmounted(&mut self, document_id: &str) {
        if self.mounted_document.as_deref() == Some(document_id) {
            self.mounted_document = None;
        }
    }

    /// The fallback timer for `request_id` fired. Only the request that is still
    /// parked may jump, and only into a viewer already bound to its document;
    /// otherwise it stays parked for the mount acknowledgment.
    pub fn fallback_elapsed(&mut self, request_id: RequestId) -> Vec<NavCommand> {
        match self.pending.take() {
            Some(pending)
                if pending.issued_at == request_id
                    && self.mounted_document.as_deref()
                        == Some(pending.target.document_id.as_str()) =>
            {
                vec![NavCommand::Jump(pending.target)]
            }
            other => {
                self.pending = other;
                Vec::new()
            }
        }
    }

    /// Drops any parked request, e.g. when the user navigates away.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn active_document(&self) -> Option<&str> {
        self.active_document.as_deref()
    }

    pub fn mounted_document(&self) -> Option<&str> {
        self.mounted_document.as_deref()
    }

    pub fn pending(&self) -> Option<&PendingNavigation> {
        self.pending.as_ref()
    }
}
