use serde::{Deserialize, Serialize};

/// One level of a product's category path.
///
/// `display_name` is preserved verbatim (including non-ASCII); `slug` is
/// either an explicit profile mapping or generated by [`slugify`]. The
/// parent of a node is the previous node in the path — the resolver builds
/// paths root → leaf and never skips levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub display_name: String,
    pub slug: String,
}

/// Transliteration for Cyrillic characters commonly seen in donor
/// breadcrumbs. Unmapped non-ASCII characters are dropped by [`slugify`].
fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "h",
        'ґ' => "g",
        'д' => "d",
        'е' => "e",
        'є' => "ye",
        'ж' => "zh",
        'з' => "z",
        'и' => "y",
        'і' => "i",
        'ї' => "yi",
        'й' => "y",
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
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ь' => "",
        'ю' => "yu",
        'я' => "ya",
        'ы' => "y",
        'э' => "e",
        'ё' => "yo",
        'ъ' => "",
        _ => return None,
    };
    Some(s)
}

/// Generates a URL-safe slug from a display name.
///
/// Deterministic: the same display name always yields the same slug, within
/// a run and across runs, so repeated runs never create duplicate category
/// branches. Lowercases, transliterates Cyrillic, collapses separator runs,
/// and drops everything else.
#[must_use]
pub fn slugify(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    for c in display_name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if let Some(t) = transliterate(c) {
            out.push_str(t);
        } else if c == ' ' || c == '-' || c == '_' || c == '/' {
            out.push('-');
        }
        // anything else (punctuation, apostrophes, unmapped scripts) drops
    }
    out.split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_is_deterministic() {
        assert_eq!(slugify("Running Shoes"), slugify("Running Shoes"));
    }

    #[test]
    fn slugify_lowercases_and_joins() {
        assert_eq!(slugify("Running Shoes"), "running-shoes");
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("Nose -  care / oils"), "nose-care-oils");
    }

    #[test]
    fn slugify_transliterates_cyrillic() {
        assert_eq!(slugify("Парфумерія"), "parfumeriya");
        assert_eq!(slugify("Жіночі аромати"), "zhinochi-aromaty");
    }

    #[test]
    fn slugify_drops_apostrophes() {
        assert_eq!(slugify("Обʼєм"), "obyem");
    }

    #[test]
    fn slugify_empty_for_unmapped_input() {
        assert_eq!(slugify("!!!"), "");
    }
}
