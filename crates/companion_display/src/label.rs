//! Companion label rendering.
//!
//! Only the three built-in placeholders are handled here; colour codes and
//! any host-specific placeholders belong to the `TextFormatter` collaborator.

/// Replaced with the owner's display name.
pub const PLAYER_PLACEHOLDER: &str = "%player%";
/// Replaced with the pet's display name.
pub const PET_PLACEHOLDER: &str = "%pet%";
/// Replaced with the owner's level in that pet.
pub const LEVEL_PLACEHOLDER: &str = "%level%";

/// Substitutes the built-in placeholders in a single pass.
///
/// Substituted text is never rescanned, so a player named `%pet%` stays
/// `%pet%`.
#[must_use]
pub fn render_label(template: &str, player: &str, pet: &str, level: u32) -> String {
    let level = level.to_string();
    let mut out = String::with_capacity(template.len() + player.len() + pet.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let substitution = [
            (PLAYER_PLACEHOLDER, player),
            (PET_PLACEHOLDER, pet),
            (LEVEL_PLACEHOLDER, level.as_str()),
        ]
        .into_iter()
        .find(|(placeholder, _)| tail.starts_with(placeholder));

        match substitution {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
