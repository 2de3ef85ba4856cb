// Domain limits for the moderation services.

/// Configuration shared by the moderation services.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Maximum number of images attached to one offer.
    pub max_offer_images: usize,

    /// Maximum review comment length, in characters.
    pub max_comment_length: usize,

    /// Stored on a rejected sale report when the admin gives no reason.
    pub default_rejection_note: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            max_offer_images: 10,
            max_comment_length: 500,
            default_rejection_note: "Payment proof not verified".to_string(),
        }
    }
}
