//! Maps a report row, its gallery and the batch signatories onto template placeholders.

use std::collections::BTreeSet;

use crate::error::BatchWarning;
use crate::models::{ContextValue, GalleryLayout, PlacedImage, TemplateContext};
use crate::services::assets::AssetResolver;
use crate::services::images::prepare_image_file;
use crate::types::{ReportField, ReportRow, SignatoryProfile, SignatoryRole};

pub const IMAGES_KEY: &str = "Images";
/// Width signatures are stamped at; height follows the image.
pub const SIGNATURE_WIDTH_MM: f64 = 30.0;

const ROLES: [SignatoryRole; 2] = [SignatoryRole::Consultant, SignatoryRole::Contractor];

/// Signatory block keys every report template is expected to declare.
pub fn required_placeholders() -> Vec<String> {
    ROLES
        .iter()
        .flat_map(|role| {
            ["Name", "Title", "Signature"]
                .into_iter()
                .map(move |suffix| format!("{}_{}", role.key_prefix(), suffix))
        })
        .collect()
}

/// Every key [`build_context`] fills in.
pub fn provided_placeholders() -> BTreeSet<String> {
    let mut keys: BTreeSet<String> = ReportField::ALL
        .iter()
        .map(|f| f.placeholder().to_string())
        .collect();
    keys.extend(required_placeholders());
    keys.insert(IMAGES_KEY.to_string());
    keys
}

/// Signatory values resolved once per batch.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSignatories {
    pub consultant: ResolvedSignatory,
    pub contractor: ResolvedSignatory,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedSignatory {
    pub name: String,
    pub title: String,
    /// `None` renders as an empty string.
    pub signature: Option<PlacedImage>,
}

impl ResolvedSignatories {
    fn get(&self, role: SignatoryRole) -> &ResolvedSignatory {
        match role {
            SignatoryRole::Consultant => &self.consultant,
            SignatoryRole::Contractor => &self.contractor,
        }
    }

    fn get_mut(&mut self, role: SignatoryRole) -> &mut ResolvedSignatory {
        match role {
            SignatoryRole::Consultant => &mut self.consultant,
            SignatoryRole::Contractor => &mut self.contractor,
        }
    }
}

/// Look up and decode both signature images. Missing or unreadable ones become warnings.
pub fn resolve_signatories(
    profile: &SignatoryProfile,
    assets: &AssetResolver,
    warnings: &mut Vec<BatchWarning>,
) -> ResolvedSignatories {
    let mut resolved = ResolvedSignatories::default();
    for role in ROLES {
        let signatory = profile.signatory(role);
        let slot = resolved.get_mut(role);
        slot.name = signatory.name.clone();
        slot.title = signatory.title.clone();

        let Some(path) = assets.resolve(&signatory.signature) else {
            if !signatory.signature.trim().is_empty() {
                tracing::warn!(%role, asset = %signatory.signature, "signature not found");
                warnings.push(BatchWarning::SignatureNotFound {
                    role,
                    asset: signatory.signature.clone(),
                });
            }
            continue;
        };
        match prepare_image_file(&path) {
            Ok(image) => {
                let (width_emu, height_emu) = image.extent_emu(SIGNATURE_WIDTH_MM, None);
                slot.signature = Some(PlacedImage {
                    image,
                    width_emu,
                    height_emu,
                });
            }
            Err(reason) => {
                tracing::warn!(%role, path = %path.display(), %reason, "signature unreadable");
                warnings.push(BatchWarning::SignatureUnreadable { role, path, reason });
            }
        }
    }
    resolved
}

/// Template context for one row.
pub fn build_context(row: &ReportRow, gallery: GalleryLayout, signatories: &ResolvedSignatories) -> TemplateContext {
    let mut ctx = TemplateContext::new();
    for field in ReportField::ALL {
        ctx.insert_text(field.placeholder(), row.get(field));
    }
    for role in ROLES {
        let signatory = signatories.get(role);
        let prefix = role.key_prefix();
        ctx.insert_text(format!("{}_Name", prefix), signatory.name.as_str());
        ctx.insert_text(format!("{}_Title", prefix), signatory.title.as_str());
        let signature = match &signatory.signature {
            Some(placed) => ContextValue::Image(placed.clone()),
            None => ContextValue::Text(String::new()),
        };
        ctx.insert(format!("{}_Signature", prefix), signature);
    }
    ctx.insert(IMAGES_KEY, ContextValue::Gallery(gallery));
    ctx
}

/// Compare what a template declares with what the builder provides.
pub fn check_placeholders(declared: &BTreeSet<String>, provided: &BTreeSet<String>, required: &[String]) -> Vec<BatchWarning> {
    let mut warnings = Vec::new();
    let missing: Vec<String> = required.iter().filter(|k| !declared.contains(*k)).cloned().collect();
    if !missing.is_empty() {
        warnings.push(BatchWarning::MissingPlaceholders { placeholders: missing });
    }
    let unknown: Vec<String> = declared.difference(provided).cloned().collect();
    if !unknown.is_empty() {
        warnings.push(BatchWarning::UnknownPlaceholders { placeholders: unknown });
    }
    warnings
}
