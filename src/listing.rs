use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::{GeneratedImage, split_cta};

pub const AMENITY_OPTIONS: [&str; 12] = [
    "Ar Condicionado",
    "Aquecimento",
    "Máquina de Lavar",
    "Secadora",
    "Lava-Louças",
    "Academia",
    "Piscina",
    "Elevador",
    "Porteiro",
    "Varanda",
    "Jardim",
    "Lareira",
];

/// Fallback calls to action when the caption did not provide one.
pub const CTA_OPTIONS: [&str; 5] = [
    "Agende uma visita hoje!",
    "Entre em contato para mais informações",
    "Marque uma visita personalizada",
    "Fale com nosso corretor agora",
    "Solicite um tour virtual ou presencial",
];

const CAPTION_UNAVAILABLE: &str = "Legenda não disponível";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    Apartment,
    House,
    Condo,
    Loft,
    Townhouse,
    Studio,
    Land,
    Commercial,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "BRL")]
    Brl,
    #[serde(rename = "GBP")]
    Gbp,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    #[default]
    Sqft,
    Sqm,
}

/// Listing details as the user fills them in. Numeric fields stay strings,
/// the caption workflow receives them verbatim.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingForm {
    pub title: String,
    pub description: String,
    pub property_type: PropertyType,
    pub price: String,
    pub currency: Currency,
    pub bedrooms: String,
    pub bathrooms: String,
    pub area: String,
    pub area_unit: AreaUnit,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state_region: String,
    pub postal_code: String,
    pub country: String,
    pub year_built: String,
    pub condition: String,
    pub available_from: String,
    pub furnished: bool,
    pub parking: bool,
    pub pet_friendly: bool,
    pub amenities: BTreeMap<String, bool>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state_region: String,
    pub postal_code: String,
    pub country: String,
}

/// Body sent to the caption webhook.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub title: String,
    pub description: String,
    pub property_type: PropertyType,
    pub price: String,
    pub currency: Currency,
    pub bedrooms: String,
    pub bathrooms: String,
    pub area: String,
    pub area_unit: AreaUnit,
    pub address: Address,
    pub year_built: String,
    pub condition: String,
    pub available_from: String,
    pub furnished: bool,
    pub parking: bool,
    pub pet_friendly: bool,
    pub amenities: Vec<String>,
}

impl ListingForm {
    /// Required fields left blank, by their wire names.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("price", &self.price),
            ("bedrooms", &self.bedrooms),
            ("bathrooms", &self.bathrooms),
            ("area", &self.area),
            ("addressLine1", &self.address_line1),
            ("city", &self.city),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    #[must_use]
    pub fn full_address(&self) -> String {
        [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state_region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
    }

    #[must_use]
    pub fn checked_amenities(&self) -> Vec<String> {
        self.amenities
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Amenity names that are not among the known options.
    #[must_use]
    pub fn unknown_amenities(&self) -> Vec<&str> {
        self.amenities
            .keys()
            .map(String::as_str)
            .filter(|name| !AMENITY_OPTIONS.contains(name))
            .collect()
    }

    #[must_use]
    pub fn caption_request(&self) -> CaptionRequest {
        CaptionRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            property_type: self.property_type,
            price: self.price.clone(),
            currency: self.currency,
            bedrooms: self.bedrooms.clone(),
            bathrooms: self.bathrooms.clone(),
            area: self.area.clone(),
            area_unit: self.area_unit,
            address: Address {
                line1: self.address_line1.clone(),
                line2: self.address_line2.clone(),
                city: self.city.clone(),
                state_region: self.state_region.clone(),
                postal_code: self.postal_code.clone(),
                country: self.country.clone(),
            },
            year_built: self.year_built.clone(),
            condition: self.condition.clone(),
            available_from: self.available_from.clone(),
            furnished: self.furnished,
            parking: self.parking,
            pet_friendly: self.pet_friendly,
            amenities: self.checked_amenities(),
        }
    }
}

/// A finished listing post: composite image, caption and call to action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPost {
    pub image: Option<GeneratedImage>,
    pub caption: String,
    pub cta: String,
}

fn random_cta<R: Rng + ?Sized>(rng: &mut R) -> String {
    CTA_OPTIONS
        .choose(rng)
        .copied()
        .unwrap_or(CTA_OPTIONS[0])
        .to_string()
}

impl ListingPost {
    pub fn compose<R: Rng + ?Sized>(
        image: Option<GeneratedImage>,
        caption_text: &str,
        rng: &mut R,
    ) -> Self {
        let (cta, rest) = split_cta(caption_text);
        let cta = if cta.is_empty() { random_cta(rng) } else { cta };
        let caption = if !rest.is_empty() {
            rest
        } else if !caption_text.is_empty() {
            caption_text.to_string()
        } else {
            CAPTION_UNAVAILABLE.to_string()
        };
        Self {
            image,
            caption,
            cta,
        }
    }

    pub fn reroll_cta<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cta = random_cta(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn complete_form() -> ListingForm {
        serde_json::from_value(json!({
            "title": "Apartamento Moderno",
            "propertyType": "condo",
            "price": "350000",
            "currency": "EUR",
            "bedrooms": "2",
            "bathrooms": "2",
            "area": "85",
            "areaUnit": "sqm",
            "addressLine1": "Rua Principal, 123",
            "addressLine2": "",
            "city": "Lisboa",
            "postalCode": "1100-000",
            "country": "Portugal",
            "furnished": true,
            "amenities": {"Varanda": true, "Elevador": true, "Piscina": false}
        }))
        .unwrap()
    }

    #[test]
    fn defaults_match_a_blank_form() {
        let form = ListingForm::default();
        assert_eq!(form.property_type, PropertyType::Apartment);
        assert_eq!(form.currency, Currency::Usd);
        assert_eq!(form.area_unit, AreaUnit::Sqft);
        assert_eq!(form.missing_fields().len(), 8);
        assert!(!form.is_complete());
    }

    #[test]
    fn whitespace_does_not_count_as_filled() {
        let mut form = complete_form();
        assert!(form.is_complete());
        form.city = "   ".into();
        assert_eq!(form.missing_fields(), vec!["city"]);
    }

    #[test]
    fn unknown_amenities_are_reported() {
        let mut form = complete_form();
        assert!(form.unknown_amenities().is_empty());
        form.amenities.insert("Heliponto".into(), true);
        assert_eq!(form.unknown_amenities(), vec!["Heliponto"]);
    }

    #[test]
    fn address_skips_empty_parts() {
        assert_eq!(
            complete_form().full_address(),
            "Rua Principal, 123, Lisboa, 1100-000, Portugal"
        );
    }

    #[test]
    fn caption_request_wire_shape() {
        let v = serde_json::to_value(complete_form().caption_request()).unwrap();
        assert_eq!(v["propertyType"], "condo");
        assert_eq!(v["currency"], "EUR");
        assert_eq!(v["areaUnit"], "sqm");
        assert_eq!(v["address"]["line1"], "Rua Principal, 123");
        assert_eq!(v["address"]["postalCode"], "1100-000");
        assert_eq!(v["petFriendly"], false);
        assert_eq!(v["amenities"], json!(["Elevador", "Varanda"]));
    }

    #[test]
    fn compose_splits_cta_from_caption() {
        let mut rng = StdRng::seed_from_u64(7);
        let post = ListingPost::compose(None, "Agende hoje.\n\nLindo apê.", &mut rng);
        assert_eq!(post.cta, "Agende hoje");
        assert_eq!(post.caption, "Lindo apê.");
    }

    #[test]
    fn compose_keeps_single_paragraph_as_caption() {
        let mut rng = StdRng::seed_from_u64(7);
        let post = ListingPost::compose(None, "Só isso.", &mut rng);
        assert_eq!(post.cta, "Só isso");
        assert_eq!(post.caption, "Só isso.");
    }

    #[test]
    fn compose_without_caption_uses_fallbacks() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut post = ListingPost::compose(
            Some(GeneratedImage::Url("https://img".into())),
            "",
            &mut rng,
        );
        assert!(CTA_OPTIONS.contains(&post.cta.as_str()));
        assert_eq!(post.caption, CAPTION_UNAVAILABLE);
        post.reroll_cta(&mut rng);
        assert!(CTA_OPTIONS.contains(&post.cta.as_str()));
    }
}
