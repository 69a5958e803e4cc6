//! Texts the bot sends.

use std::fmt::Write as _;

use crate::model::{ItemKind, Profile, Report, ReportSubject};

pub(crate) const WELCOME: &str = "Welcome! Please enter your full name:";
pub(crate) const REGISTRATION_REQUIRED: &str =
    "You need to register before reporting items. Please enter your full name:";
pub(crate) const ASK_PHONE: &str = "Please enter your phone number:";
pub(crate) const ASK_ID_NUMBER: &str = "Please enter your ID number:";
pub(crate) const ASK_ITEM_KIND: &str = "Is this item an ID?";
pub(crate) const ASK_REPORT_ID_NUMBER: &str = "Please enter the ID number:";
pub(crate) const ASK_DESCRIPTION: &str =
    "Please describe the item (you can send text or a photo with description):";
pub(crate) const OWNER_NOTIFIED: &str = "The ID owner has been notified!";
pub(crate) const OWNER_UNKNOWN: &str =
    "We couldn't find the ID owner in our system. The report has been posted to the channel.";
pub(crate) const LOST_ID_REPORTED: &str = "Your lost ID has been reported to the channel.";
pub(crate) const NO_ITEMS: &str = "No items reported yet.";
pub(crate) const GENERIC_ERROR: &str = "An error occurred. Please try again.";

const NO_DESCRIPTION: &str = "No description provided";

/// Channel post announcing a report.
pub(crate) fn broadcast(kind: ItemKind, reporter: &Profile, subject: &ReportSubject) -> String {
    let (label, detail) = match subject {
        ReportSubject::IdNumber(number) => ("ID", format!("🆔 ID Number: {number}")),
        ReportSubject::Description { text, .. } => {
            let text = if text.is_empty() { NO_DESCRIPTION } else { text };
            ("ITEM", format!("📝 Description: {text}"))
        }
    };
    format!(
        "📢 {} {label}\n👤 Name: {}\n📞 Phone: {}\n{detail}",
        kind.headline(),
        reporter.name,
        reporter.phone_number
    )
}

/// Direct message telling an ID owner who found their ID.
pub(crate) fn owner_notice(finder: &Profile) -> String {
    format!(
        "🎉 Good news! Your lost ID has been found!\n\n\
         Found by: {}\n\
         Contact: {}\n\n\
         Please contact them to arrange retrieval.",
        finder.name, finder.phone_number
    )
}

/// Confirmation after an item report.
pub(crate) fn item_reported(kind: ItemKind, with_photo: bool) -> String {
    if with_photo {
        format!("Your {kind} item with photo has been reported to the channel.")
    } else {
        format!("Your {kind} item has been reported to the channel.")
    }
}

/// Listing of every report, or the empty notice.
pub(crate) fn listing(reports: &[Report]) -> String {
    if reports.is_empty() {
        return NO_ITEMS.to_string();
    }
    let mut out = String::from("Recent items:\n\n");
    for report in reports {
        let description = match &report.subject {
            ReportSubject::IdNumber(number) => format!("ID: {number}"),
            ReportSubject::Description { text, .. } if text.is_empty() => {
                NO_DESCRIPTION.to_string()
            }
            ReportSubject::Description { text, .. } => text.clone(),
        };
        let _ = write!(out, "Type: {}\nDescription: {description}\n\n", report.kind);
    }
    out
}
