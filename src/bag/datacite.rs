//! `metadata/datacite.xml` (DataCite kernel 4)

use super::xml_escape;
use crate::deposit::Deposit;
use std::fmt::Write as _;

pub const DATACITE_PATH: &str = "metadata/datacite.xml";

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<resource xmlns="http://datacite.org/schema/kernel-4" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://datacite.org/schema/kernel-4 http://schema.datacite.org/meta/kernel-4/metadata.xsd">
"#;

/// DOI of the deposit, falling back to its id, without a `doi:` scheme prefix
fn identifier(deposit: &Deposit) -> &str {
    let id = deposit.doi.as_deref().unwrap_or(&deposit.id);
    id.strip_prefix("doi:").unwrap_or(id)
}

pub fn render(deposit: &Deposit, publisher: &str, publication_year: i32) -> String {
    let mut xml = String::from(HEADER);

    let _ = writeln!(
        xml,
        "  <identifier identifierType=\"DOI\">{}</identifier>",
        xml_escape(identifier(deposit))
    );

    xml.push_str("  <creators>\n");
    for author in &deposit.authors {
        xml.push_str("    <creator>\n");
        let _ = writeln!(xml, "      <creatorName>{}</creatorName>", xml_escape(&author.name));
        if let Some(affiliation) = &author.affiliation {
            let _ = writeln!(xml, "      <affiliation>{}</affiliation>", xml_escape(affiliation));
        }
        xml.push_str("    </creator>\n");
    }
    xml.push_str("  </creators>\n");

    let _ = writeln!(
        xml,
        "  <titles>\n    <title>{}</title>\n  </titles>",
        xml_escape(&deposit.title)
    );
    let _ = writeln!(xml, "  <publisher>{}</publisher>", xml_escape(publisher));
    let _ = writeln!(xml, "  <publicationYear>{}</publicationYear>", publication_year);
    xml.push_str("  <resourceType resourceTypeGeneral=\"Dataset\"/>\n");

    if let Some(nbn) = &deposit.nbn {
        let _ = writeln!(
            xml,
            "  <alternateIdentifiers>\n    <alternateIdentifier alternateIdentifierType=\"URN\">{}</alternateIdentifier>\n  </alternateIdentifiers>",
            xml_escape(nbn)
        );
    }

    if !deposit.descriptions.is_empty() {
        let _ = writeln!(
            xml,
            "  <descriptions>\n    <description descriptionType=\"Abstract\">{}</description>\n  </descriptions>",
            xml_escape(&deposit.descriptions.join("; "))
        );
    }

    xml.push_str("</resource>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit::Author;

    fn deposit() -> Deposit {
        Deposit::builder()
            .id("deposit-1")
            .path("/inbox/deposit-1")
            .bag_dir("/inbox/deposit-1/bag")
            .title("Bags & boxes")
            .depositor_id("user001")
            .doi("doi:10.17026/dans-12345")
            .nbn("urn:nbn:nl:ui:13-abc")
            .descriptions(vec!["One".to_string(), "Two".to_string()])
            .authors(vec![
                Author {
                    name: "D.N. Aarden".to_string(),
                    affiliation: Some("Utrecht University".to_string()),
                },
                Author {
                    name: "DANS".to_string(),
                    affiliation: None,
                },
            ])
            .build()
    }

    #[test]
    fn test_render_fields() {
        let xml = render(&deposit(), "DANS", 2024);

        assert!(xml.contains(r#"<identifier identifierType="DOI">10.17026/dans-12345</identifier>"#));
        assert!(xml.contains("<title>Bags &amp; boxes</title>"));
        assert!(xml.contains("<creatorName>D.N. Aarden</creatorName>"));
        assert!(xml.contains("<affiliation>Utrecht University</affiliation>"));
        assert_eq!(xml.matches("<affiliation>").count(), 1);
        assert!(xml.contains("<publisher>DANS</publisher>"));
        assert!(xml.contains("<publicationYear>2024</publicationYear>"));
        assert!(xml.contains(r#"<resourceType resourceTypeGeneral="Dataset"/>"#));
        assert!(xml.contains(r#"alternateIdentifierType="URN">urn:nbn:nl:ui:13-abc<"#));
        assert!(xml.contains(r#"<description descriptionType="Abstract">One; Two</description>"#));
    }

    #[test]
    fn test_identifier_falls_back_to_id() {
        let mut deposit = deposit();
        deposit.doi = None;
        deposit.descriptions.clear();

        let xml = render(&deposit, "DANS", 2024);
        assert!(xml.contains(">deposit-1</identifier>"));
        assert!(!xml.contains("<descriptions>"));
    }

    #[test]
    fn test_output_is_well_formed() {
        let xml = render(&deposit(), "DANS", 2024);
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "resource");
    }

    #[test]
    fn test_hostile_title_stays_well_formed() {
        let mut deposit = deposit();
        deposit.title = "<b>&\"quoted\"\u{1}</b>".to_string();

        let xml = render(&deposit, "DANS", 2024);
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let title = doc
            .descendants()
            .find(|n| n.has_tag_name("title"))
            .and_then(|n| n.text())
            .unwrap();
        assert_eq!(title, "<b>&\"quoted\"</b>");
    }
}
