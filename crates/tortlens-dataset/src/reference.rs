//! Static reference table of medical-device MDLs.
//!
//! Hand-maintained. Settlement amounts are the headline figures announced
//! publicly; `None` means no aggregate figure was disclosed. Check the
//! docket before quoting any of these.

use std::fmt::Write as _;

use tortlens_common::{CaseSource, CaseStatus, LitigationCase};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceEntry {
    pub mdl_number: u32,
    pub title: &'static str,
    pub device: &'static str,
    pub manufacturer: &'static str,
    pub court: &'static str,
    pub filed_year: u16,
    pub status: CaseStatus,
    pub settlement_amount_usd: Option<u64>,
    pub notes: &'static str,
}

const REFERENCE_TABLE: &[ReferenceEntry] = &[
    ReferenceEntry {
        mdl_number: 2187,
        title: "In re C.R. Bard, Inc., Pelvic Repair System Products Liability Litigation",
        device: "Avaulta pelvic mesh",
        manufacturer: "C.R. Bard",
        court: "S.D. W.Va.",
        filed_year: 2010,
        status: CaseStatus::Settled,
        settlement_amount_usd: None,
        notes: "One of seven transvaginal mesh MDLs centralised before Judge Goodwin.",
    },
    ReferenceEntry {
        mdl_number: 2197,
        title: "In re DePuy Orthopaedics, Inc., ASR Hip Implant Products Liability Litigation",
        device: "ASR XL Acetabular System",
        manufacturer: "DePuy Orthopaedics",
        court: "N.D. Ohio",
        filed_year: 2010,
        status: CaseStatus::Settled,
        settlement_amount_usd: Some(2_475_000_000),
        notes: "Metal-on-metal hip recalled August 2010; 2013 program covered revision surgeries.",
    },
    ReferenceEntry {
        mdl_number: 2244,
        title: "In re DePuy Orthopaedics, Inc., Pinnacle Hip Implant Products Liability Litigation",
        device: "Pinnacle Acetabular Cup System",
        manufacturer: "DePuy Orthopaedics",
        court: "N.D. Tex.",
        filed_year: 2011,
        status: CaseStatus::Settled,
        settlement_amount_usd: None,
        notes: "Large bellwether verdicts; confidential global settlement in 2019.",
    },
    ReferenceEntry {
        mdl_number: 2327,
        title: "In re Ethicon, Inc., Pelvic Repair System Products Liability Litigation",
        device: "Gynecare Prolift",
        manufacturer: "Ethicon",
        court: "S.D. W.Va.",
        filed_year: 2012,
        status: CaseStatus::Settled,
        settlement_amount_usd: None,
        notes: "Largest of the transvaginal mesh MDLs by filed cases.",
    },
    ReferenceEntry {
        mdl_number: 2391,
        title: "In re Biomet M2a Magnum Hip Implant Products Liability Litigation",
        device: "M2a-Magnum",
        manufacturer: "Biomet",
        court: "N.D. Ind.",
        filed_year: 2012,
        status: CaseStatus::Settled,
        settlement_amount_usd: Some(56_000_000),
        notes: "2014 base settlement with per-claim deductions.",
    },
    ReferenceEntry {
        mdl_number: 2570,
        title: "In re Cook Medical, Inc., IVC Filters Marketing, Sales Practices and Products Liability Litigation",
        device: "Celect / Gunther Tulip IVC filter",
        manufacturer: "Cook Medical",
        court: "S.D. Ind.",
        filed_year: 2014,
        status: CaseStatus::Active,
        settlement_amount_usd: None,
        notes: "Claims allege tilt, perforation and fracture of retrievable filters.",
    },
    ReferenceEntry {
        mdl_number: 2641,
        title: "In re Bard IVC Filters Products Liability Litigation",
        device: "G2 / Eclipse / Recovery IVC filter",
        manufacturer: "C.R. Bard",
        court: "D. Ariz.",
        filed_year: 2015,
        status: CaseStatus::Settled,
        settlement_amount_usd: None,
        notes: "Remanded after bellwethers; bulk of inventory resolved by private settlements.",
    },
    ReferenceEntry {
        mdl_number: 2782,
        title: "In re Ethicon Physiomesh Flexible Composite Hernia Mesh Products Liability Litigation",
        device: "Physiomesh",
        manufacturer: "Ethicon",
        court: "N.D. Ga.",
        filed_year: 2017,
        status: CaseStatus::Settled,
        settlement_amount_usd: None,
        notes: "Product withdrawn from market in 2016.",
    },
    ReferenceEntry {
        mdl_number: 2846,
        title: "In re Davol, Inc./C.R. Bard, Inc., Polypropylene Hernia Mesh Products Liability Litigation",
        device: "Ventralex / PerFix hernia mesh",
        manufacturer: "C.R. Bard",
        court: "S.D. Ohio",
        filed_year: 2018,
        status: CaseStatus::Active,
        settlement_amount_usd: None,
        notes: "Polypropylene hernia mesh; bellwether trials held from 2021.",
    },
    ReferenceEntry {
        mdl_number: 3014,
        title: "In re Philips Recalled CPAP, Bi-Level PAP, and Mechanical Ventilator Products Litigation",
        device: "DreamStation",
        manufacturer: "Philips Respironics",
        court: "W.D. Pa.",
        filed_year: 2021,
        status: CaseStatus::Settled,
        settlement_amount_usd: Some(1_100_000_000),
        notes: "Foam degradation recall June 2021; figure is the 2024 personal-injury settlement.",
    },
];

pub fn reference_table() -> &'static [ReferenceEntry] {
    REFERENCE_TABLE
}

pub fn find_by_mdl(number: u32) -> Option<&'static ReferenceEntry> {
    REFERENCE_TABLE.iter().find(|e| e.mdl_number == number)
}

/// Case-insensitive substring match on the manufacturer.
pub fn find_by_manufacturer(name: &str) -> Vec<&'static ReferenceEntry> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    REFERENCE_TABLE
        .iter()
        .filter(|e| e.manufacturer.to_lowercase().contains(&needle))
        .collect()
}

impl ReferenceEntry {
    pub fn to_case(&self) -> LitigationCase {
        let mut case = LitigationCase::new(
            format!("mdl-{}", self.mdl_number),
            self.title,
            CaseSource::Reference,
        );
        case.mdl_number = Some(self.mdl_number);
        case.court = Some(self.court.to_string());
        case.device = Some(self.device.to_string());
        case.manufacturer = Some(self.manufacturer.to_string());
        case.status = self.status;
        case.settlement_amount_usd = self.settlement_amount_usd;
        case.notes.push(self.notes.to_string());
        case
    }
}

/// `1234567` → `$1,234,567`.
pub fn format_usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Plain-text report of `entries` with a total of disclosed settlements.
pub fn render_report(entries: &[&ReferenceEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<28} {:<22} {:<12} {:<6} {:<9} {:>16}",
        "MDL", "Device", "Manufacturer", "Court", "Filed", "Status", "Settlement"
    );
    let _ = writeln!(out, "{}", "-".repeat(105));

    let mut disclosed = 0u64;
    for e in entries {
        let amount = match e.settlement_amount_usd {
            Some(v) => {
                disclosed = disclosed.saturating_add(v);
                format_usd(v)
            }
            None => "undisclosed".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<6} {:<28} {:<22} {:<12} {:<6} {:<9} {:>16}",
            e.mdl_number,
            clip(e.device, 28),
            clip(e.manufacturer, 22),
            e.court,
            e.filed_year,
            e.status.as_str(),
            amount
        );
        let _ = writeln!(out, "       {}", e.notes);
    }

    let _ = writeln!(out, "{}", "-".repeat(105));
    let _ = writeln!(
        out,
        "{} MDLs, disclosed settlements total {}",
        entries.len(),
        format_usd(disclosed)
    );
    out
}
