//! Device contacts listing, gated on the contacts capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub record_id: String,
    pub given_name: String,
    pub family_name: String,
    pub phone_numbers: Vec<String>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.given_name, self.family_name);
        name.trim().to_string()
    }

    /// Section letter: first letter of the family name, falling back
    /// to the given name, then '#'.
    fn section_letter(&self) -> char {
        self.family_name
            .chars()
            .chain(self.given_name.chars())
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| c.is_ascii_alphabetic())
            .unwrap_or('#')
    }
}

/// One alphabetical section of the contacts list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSection {
    pub title: String,
    pub contacts: Vec<Contact>,
}

/// Group contacts into sections keyed by initial letter, sections
/// sorted alphabetically.
pub fn section_by_initial(contacts: Vec<Contact>) -> Vec<ContactSection> {
    let mut sections: BTreeMap<char, Vec<Contact>> = BTreeMap::new();
    for contact in contacts {
        sections
            .entry(contact.section_letter())
            .or_default()
            .push(contact);
    }

    sections
        .into_iter()
        .map(|(letter, contacts)| ContactSection {
            title: letter.to_string(),
            contacts,
        })
        .collect()
}

/// Device contacts boundary.
#[async_trait]
pub trait ContactsSource: Send + Sync {
    async fn all(&self) -> Result<Vec<Contact>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(given: &str, family: &str) -> Contact {
        Contact {
            record_id: format!("{given}.{family}"),
            given_name: given.into(),
            family_name: family.into(),
            phone_numbers: vec!["5550000".into()],
        }
    }

    #[test]
    fn sections_key_on_family_name_with_fallbacks() {
        let sections = section_by_initial(vec![
            contact("Alice", "Zimmer"),
            contact("Bob", ""),
            contact("", ""),
            contact("Carol", "Zane"),
        ]);

        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["#", "B", "Z"]);
        assert_eq!(sections[2].contacts.len(), 2);
    }

    #[test]
    fn display_name_trims_missing_parts() {
        assert_eq!(contact("Bob", "").display_name(), "Bob");
        assert_eq!(contact("Alice", "Zimmer").display_name(), "Alice Zimmer");
    }
}
