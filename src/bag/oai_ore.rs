//! OAI-ORE resource map of a deposit, as RDF/XML and as framed JSON-LD
//!
//! The resource map (`urn:uuid:<deposit id>`) describes one aggregation,
//! identified by the deposit's NBN, which aggregates every payload file.

use super::xml_escape;
use crate::deposit::{Deposit, PayloadFile};
use serde_json::{Value, json};
use std::fmt::Write as _;

pub const OAI_ORE_RDF_PATH: &str = "metadata/oai-ore.rdf";
pub const OAI_ORE_JSONLD_PATH: &str = "metadata/oai-ore.jsonld";

const ORE_CONTEXT: &str = "https://w3id.org/ore/context";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_ORE: &str = "http://www.openarchives.org/ore/terms/";
const NS_DCTERMS: &str = "http://purl.org/dc/terms/";
const NS_DVCORE: &str = "https://dataverse.org/schema/core#";

/// Resource map view over a deposit whose NBN is known
pub struct ResourceMap<'a> {
    deposit: &'a Deposit,
    aggregation_id: &'a str,
}

impl<'a> ResourceMap<'a> {
    /// `None` until the deposit has an NBN to identify the aggregation with
    pub fn new(deposit: &'a Deposit) -> Option<Self> {
        let aggregation_id = deposit.nbn.as_deref()?;
        Some(Self {
            deposit,
            aggregation_id,
        })
    }

    pub fn id(&self) -> String {
        format!("urn:uuid:{}", self.deposit.id)
    }

    pub fn to_rdf_xml(&self) -> String {
        let map_id = xml_escape(&self.id());
        let aggregation_id = xml_escape(self.aggregation_id);

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            xml,
            "<rdf:RDF xmlns:rdf=\"{NS_RDF}\" xmlns:ore=\"{NS_ORE}\" xmlns:dcterms=\"{NS_DCTERMS}\" xmlns:dvcore=\"{NS_DVCORE}\">"
        );

        let _ = writeln!(xml, "  <ore:ResourceMap rdf:about=\"{map_id}\">");
        let _ = writeln!(xml, "    <ore:describes rdf:resource=\"{aggregation_id}\"/>");
        xml.push_str("  </ore:ResourceMap>\n");

        let _ = writeln!(xml, "  <ore:Aggregation rdf:about=\"{aggregation_id}\">");
        let _ = writeln!(xml, "    <dcterms:title>{}</dcterms:title>", xml_escape(&self.deposit.title));
        if let Some(doi) = &self.deposit.doi {
            let _ = writeln!(xml, "    <dcterms:identifier>{}</dcterms:identifier>", xml_escape(doi));
        }
        for author in &self.deposit.authors {
            let _ = writeln!(xml, "    <dcterms:creator>{}</dcterms:creator>", xml_escape(&author.name));
        }
        for description in &self.deposit.descriptions {
            let _ = writeln!(xml, "    <dcterms:description>{}</dcterms:description>", xml_escape(description));
        }
        let _ = writeln!(xml, "    <ore:isDescribedBy rdf:resource=\"{map_id}\"/>");
        for file in &self.deposit.payload_files {
            let _ = writeln!(xml, "    <ore:aggregates rdf:resource=\"{}\"/>", xml_escape(&file.id));
        }
        xml.push_str("  </ore:Aggregation>\n");

        for file in &self.deposit.payload_files {
            write_resource(&mut xml, file);
        }

        xml.push_str("</rdf:RDF>\n");
        xml
    }

    pub fn to_json_ld(&self) -> Result<String, serde_json::Error> {
        let aggregates: Vec<Value> = self
            .deposit
            .payload_files
            .iter()
            .map(|file| {
                json!({
                    "@id": file.id,
                    "@type": "AggregatedResource",
                    "dcterms:title": file.file_name(),
                    "dvcore:directoryLabel": file.directory_label(),
                    "dcterms:description": file.description,
                    "dvcore:restricted": file.restricted,
                })
            })
            .collect();

        let mut aggregation = json!({
            "@id": self.aggregation_id,
            "@type": "Aggregation",
            "isDescribedBy": self.id(),
            "dcterms:title": self.deposit.title,
            "dcterms:creator": self.deposit.authors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            "dcterms:description": self.deposit.descriptions,
            "aggregates": aggregates,
        });
        if let (Some(doi), Some(map)) = (&self.deposit.doi, aggregation.as_object_mut()) {
            map.insert("dcterms:identifier".to_string(), json!(doi));
        }

        let document = json!({
            "@context": [
                ORE_CONTEXT,
                { "dcterms": NS_DCTERMS, "dvcore": NS_DVCORE },
            ],
            "@id": self.id(),
            "@type": "ResourceMap",
            "describes": aggregation,
        });

        serde_json::to_string_pretty(&document)
    }
}

fn write_resource(xml: &mut String, file: &PayloadFile) {
    let _ = writeln!(xml, "  <ore:AggregatedResource rdf:about=\"{}\">", xml_escape(&file.id));
    let _ = writeln!(xml, "    <dcterms:title>{}</dcterms:title>", xml_escape(file.file_name()));
    let _ = writeln!(
        xml,
        "    <dvcore:directoryLabel>{}</dvcore:directoryLabel>",
        xml_escape(file.directory_label())
    );
    if !file.description.is_empty() {
        let _ = writeln!(
            xml,
            "    <dcterms:description>{}</dcterms:description>",
            xml_escape(&file.description)
        );
    }
    let _ = writeln!(xml, "    <dvcore:restricted>{}</dvcore:restricted>", file.restricted);
    xml.push_str("  </ore:AggregatedResource>\n");
}
