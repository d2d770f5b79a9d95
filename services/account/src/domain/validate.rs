//! Input format rules. Lengths count characters; "word" characters are
//! Unicode alphanumerics plus `_`.

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn char_len_in(s: &str, min: usize, max: usize) -> bool {
    let len = s.chars().count();
    (min..=max).contains(&len)
}

/// User and OAuth client names: 3–16 word characters.
pub fn validate_name(name: &str) -> bool {
    char_len_in(name, 3, 16) && name.chars().all(is_word)
}

/// Nicknames: 3–16 of word characters, space or `-`.
pub fn validate_nickname(nickname: &str) -> bool {
    char_len_in(nickname, 3, 16)
        && nickname
            .chars()
            .all(|c| is_word(c) || c == ' ' || c == '-')
}

/// Group names: 3–24 word characters.
pub fn validate_group_name(name: &str) -> bool {
    char_len_in(name, 3, 24) && name.chars().all(is_word)
}

/// Email: at most 64 characters, a non-empty local part, and a domain made of
/// dot-separated word labels.
pub fn validate_email(email: &str) -> bool {
    if email.chars().count() > 64 {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('\n') {
        return false;
    }
    domain
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(is_word))
}

/// Passwords: 8–20 characters, no line breaks.
pub fn validate_password(password: &str) -> bool {
    char_len_in(password, 8, 20) && !password.contains('\n')
}

pub const URL_MAX_LEN: usize = 128;
pub const DESCRIPTION_MAX_LEN: usize = 256;

pub fn validate_url(url: &str) -> bool {
    !url.is_empty() && url.chars().count() <= URL_MAX_LEN
}

pub fn validate_description(description: &str) -> bool {
    description.chars().count() <= DESCRIPTION_MAX_LEN
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
