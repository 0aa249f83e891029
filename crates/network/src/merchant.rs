use serde::{Deserialize, Serialize};

/// Merchant categories the authorization rules branch on.
///
/// Only the categories with special hold behavior are distinguished; every
/// other MCC maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantType {
    AutomatedFuelDispensers,
    AirlinesAirCarriers,
    CarRentalAgencies,
    CruiseLines,
    HotelsMotelsAndResorts,
    DrinkingPlaces,
    EatingPlacesRestaurants,
    FastFoodRestaurants,
    TaxicabsLimousines,
    Other,
}

impl MerchantType {
    pub fn from_mcc(mcc: u16) -> Self {
        match mcc {
            5542 => MerchantType::AutomatedFuelDispensers,
            4511 => MerchantType::AirlinesAirCarriers,
            7512 => MerchantType::CarRentalAgencies,
            4411 => MerchantType::CruiseLines,
            7011 => MerchantType::HotelsMotelsAndResorts,
            5813 => MerchantType::DrinkingPlaces,
            5812 => MerchantType::EatingPlacesRestaurants,
            5814 => MerchantType::FastFoodRestaurants,
            4121 => MerchantType::TaxicabsLimousines,
            _ => MerchantType::Other,
        }
    }
}

/// Merchant fields carried on every network message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub name: String,
    pub merchant_number: String,
    pub category_code: u16,
    pub merchant_type: MerchantType,
    /// ISO 3166-1 alpha-2 country of the acceptor.
    pub country: String,
}

impl Merchant {
    pub fn new(
        name: impl Into<String>,
        merchant_number: impl Into<String>,
        category_code: u16,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            merchant_number: merchant_number.into(),
            category_code,
            merchant_type: MerchantType::from_mcc(category_code),
            country: country.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcc_maps_to_special_categories() {
        assert_eq!(MerchantType::from_mcc(5542), MerchantType::AutomatedFuelDispensers);
        assert_eq!(MerchantType::from_mcc(5812), MerchantType::EatingPlacesRestaurants);
        assert_eq!(MerchantType::from_mcc(9999), MerchantType::Other);
    }

    #[test]
    fn merchant_derives_type_from_mcc() {
        let m = Merchant::new("SKY AIR", "M-1", 4511, "US");
        assert_eq!(m.merchant_type, MerchantType::AirlinesAirCarriers);
    }
}
