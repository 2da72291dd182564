//! Canonical slugs for catalog entities.
//!
//! A slug is the idempotency key for catalog upserts, so the functions here
//! must stay pure and deterministic.

/// Maximum slug length in bytes. Slugs are ASCII so bytes and chars agree.
pub const MAX_SLUG_LEN: usize = 150;

/// Transliterates accented Latin characters to their closest ASCII
/// equivalent. Characters without a mapping pass through unchanged.
#[must_use]
pub fn fold_diacritics(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match fold_char(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

#[allow(clippy::match_same_arms)]
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' | 'ć' | 'č' | 'ĉ' => "c",
        'Ç' | 'Ć' | 'Č' | 'Ĉ' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => "E",
        'ğ' | 'ĝ' => "g",
        'Ğ' | 'Ĝ' => "G",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' | 'İ' => "I",
        'ł' | 'ľ' | 'ĺ' => "l",
        'Ł' | 'Ľ' | 'Ĺ' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ŕ' | 'ř' => "r",
        'Ŕ' | 'Ř' => "R",
        'ś' | 'š' | 'ş' | 'ș' => "s",
        'Ś' | 'Š' | 'Ş' | 'Ș' => "S",
        'ß' => "ss",
        'ť' | 'ţ' | 'ț' => "t",
        'Ť' | 'Ţ' | 'Ț' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ž' | 'ź' | 'ż' => "z",
        'Ž' | 'Ź' | 'Ż' => "Z",
        '’' | '‘' | 'ʼ' => "'",
        _ => return None,
    };
    Some(folded)
}

/// Generates a URL-safe slug constrained to `[a-z0-9-]`.
///
/// Accents are folded first so `"Château"` becomes `"chateau"` rather than
/// `"ch-teau"`. Apostrophes are dropped without a separator
/// (`"d'Yquem"` → `"dyquem"`). The result is truncated to
/// [`MAX_SLUG_LEN`] at a hyphen boundary when possible.
#[must_use]
pub fn slugify(input: &str) -> String {
    let folded = fold_diacritics(input).to_ascii_lowercase();
    let mut slug = String::with_capacity(folded.len());
    let mut pending_hyphen = false;

    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == '\'' {
            // elided articles stay attached to the following word
        } else {
            pending_hyphen = true;
        }
    }

    truncate_slug(&slug, MAX_SLUG_LEN)
}

/// Truncates an ASCII slug to at most `max` bytes, preferring to cut at the
/// last hyphen inside the limit. Never leaves a trailing hyphen.
#[must_use]
pub fn truncate_slug(slug: &str, max: usize) -> String {
    if slug.len() <= max {
        return slug.to_string();
    }
    let head = &slug[..max];
    let cut = match head.rfind('-') {
        Some(pos) if pos > 0 => &head[..pos],
        _ => head,
    };
    cut.trim_end_matches('-').to_string()
}
