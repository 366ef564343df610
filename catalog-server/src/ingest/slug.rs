//! URL slugs for catalog entities

use sha2::{Digest, Sha256};

/// Lowercase ASCII slug; Cyrillic is transliterated, every other run of
/// non-alphanumerics becomes one `-`.
///
/// Input with nothing sluggable gets a stable hash-derived slug so the same
/// name always maps to the same slug.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_dash = true;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_dash = false;
        } else if let Some(latin) = transliterate(ch) {
            slug.push_str(latin);
            last_dash = latin.is_empty() && last_dash;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        return fallback(input);
    }
    slug.to_string()
}

fn fallback(input: &str) -> String {
    let digest = Sha256::digest(input.trim().as_bytes());
    format!("n-{}", &hex::encode(digest)[..10])
}

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        assert_eq!(slugify("Widget"), "widget");
        assert_eq!(slugify("  Power Tools & More!  "), "power-tools-more");
        assert_eq!(slugify("A--B__C"), "a-b-c");
    }

    #[test]
    fn test_cyrillic() {
        assert_eq!(slugify("Инструменты"), "instrumenty");
        assert_eq!(slugify("Дрель ударная"), "drel-udarnaya");
        assert_eq!(slugify("Объём"), "obyom");
    }

    #[test]
    fn test_fallback_is_stable() {
        let a = slugify("!!!");
        assert!(a.starts_with("n-"));
        assert_eq!(a, slugify("!!!"));
        assert_ne!(a, slugify("???"));
        assert_eq!(slugify("水"), slugify("水"));
    }
}
