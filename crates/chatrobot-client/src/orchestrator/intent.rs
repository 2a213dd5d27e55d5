use chatrobot_shared::constants::IMAGE_TRIGGER_KEYWORDS;
use chatrobot_shared::ImageRef;

/// Which gateway capability answers a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ImageGeneration,
    /// Ask about the newest image already in the conversation.
    Vision(ImageRef),
    Text,
}

impl Route {
    /// Keywords win over an image in context.  A local handle in context is
    /// not routed to vision because the gateway cannot read it.
    pub fn for_message(text: &str, latest_image: Option<&str>) -> Self {
        if wants_image(text) {
            return Route::ImageGeneration;
        }
        match latest_image.map(ImageRef::parse) {
            Some(image) if image.is_shareable() => Route::Vision(image),
            _ => Route::Text,
        }
    }
}

fn wants_image(text: &str) -> bool {
    let lowered = text.to_lowercase();
    IMAGE_TRIGGER_KEYWORDS.iter().any(|k| lowered.contains(k))
}
