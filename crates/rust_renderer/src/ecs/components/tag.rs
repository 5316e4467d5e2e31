//! Debug name and gameplay tag

use crate::ecs::Component;

/// Maximum stored name length in bytes, including the terminating zero
pub const TAG_NAME_LEN: usize = 32;

/// Fixed-size name plus a free-form numeric tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagComponent {
    name: [u8; TAG_NAME_LEN],
    /// Application-defined tag value
    pub tag: u32,
}

impl Component for TagComponent {}

impl Default for TagComponent {
    fn default() -> Self {
        Self {
            name: [0; TAG_NAME_LEN],
            tag: 0,
        }
    }
}

impl TagComponent {
    /// Store `name`, truncated to 31 bytes on a character boundary
    pub fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(TAG_NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.name = [0; TAG_NAME_LEN];
        self.name[..end].copy_from_slice(&name.as_bytes()[..end]);
    }

    /// The stored name
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(TAG_NAME_LEN);
        std::str::from_utf8(&self.name[..end]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        let mut tag = TagComponent::default();
        assert_eq!(tag.name(), "");
        tag.set_name("point light");
        assert_eq!(tag.name(), "point light");
    }

    #[test]
    fn test_long_name_truncated() {
        let mut tag = TagComponent::default();
        tag.set_name(&"x".repeat(40));
        assert_eq!(tag.name().len(), TAG_NAME_LEN - 1);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let mut tag = TagComponent::default();
        let name = format!("{}é", "a".repeat(30));
        tag.set_name(&name);
        assert_eq!(tag.name(), "a".repeat(30));
    }
}
