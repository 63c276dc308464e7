//! Breadcrumb-trail to category-path resolution.

use donorsync_core::category::{slugify, CategoryNode};
use donorsync_core::profile::CategorySection;

/// Resolves a breadcrumb trail into an ordered category path, root first.
///
/// The trailing crumb is dropped when the profile says the trail ends on
/// the product title. Excluded names (storefront root labels like
/// "Головна") are removed wherever they appear. Every remaining crumb
/// becomes a level: explicitly mapped names take their configured slug,
/// unmapped names get a generated one, so intermediate levels are never
/// silently skipped.
#[must_use]
pub fn resolve_categories(breadcrumbs: &[String], section: &CategorySection) -> Vec<CategoryNode> {
    let trail = if section.drop_last && !breadcrumbs.is_empty() {
        &breadcrumbs[..breadcrumbs.len() - 1]
    } else {
        breadcrumbs
    };

    trail
        .iter()
        .filter(|name| !section.exclude.iter().any(|ex| ex == *name))
        .map(|name| CategoryNode {
            display_name: name.clone(),
            slug: section
                .map
                .get(name)
                .cloned()
                .unwrap_or_else(|| slugify(name)),
        })
        .collect()
}
