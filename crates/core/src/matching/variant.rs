use crate::domain::intent::ExtractedProductIntent;
use crate::domain::product::{Product, ProductVariant};

pub fn size_matches(requested: &str, variant: &ProductVariant) -> bool {
    variant.size().is_some_and(|size| size.eq_ignore_ascii_case(requested.trim()))
}

/// The requested color only needs to appear within the variant's color, so
/// `red` matches `Electric Red`.
pub fn color_matches(requested: &str, variant: &ProductVariant) -> bool {
    let requested = requested.trim().to_lowercase();
    variant.color().is_some_and(|color| color.to_lowercase().contains(&requested))
}

pub fn variant_matches(intent: &ExtractedProductIntent, variant: &ProductVariant) -> bool {
    variant.is_available()
        && intent.size.as_deref().map_or(true, |size| size_matches(size, variant))
        && intent.color.as_deref().map_or(true, |color| color_matches(color, variant))
}

/// First variant satisfying the requested size and color, or the first in-stock
/// variant when neither is requested.
pub fn first_matching_variant<'a>(
    product: &'a Product,
    intent: &ExtractedProductIntent,
) -> Option<&'a ProductVariant> {
    product.variants.iter().find(|variant| variant_matches(intent, variant))
}
