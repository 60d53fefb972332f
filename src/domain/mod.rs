//! Domain primitives for the vehicle catalog.
//!
//! Identifiers are newtypes so a model id can never be passed where a brand id
//! is expected. The production window carries the one compatibility rule every
//! other layer must agree on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

catalog_id!(
    /// Identifier of a vehicle manufacturer.
    BrandId
);

catalog_id!(
    /// Identifier of a model line owned by a brand.
    ModelId
);

catalog_id!(
    /// Identifier of an engine variant ("type") owned by a model.
    EngineVariantId
);

/// Interval during which an engine variant was manufactured.
///
/// `year_to == None` means the variant is still in production. A variant is
/// compatible with year `y` iff `year_from <= y` and (`year_to` is open or
/// `y <= year_to`). Both bounds are inclusive; months are informational and do
/// not take part in the year check.
///
/// ```rust
/// use vehicle_catalog::domain::ProductionWindow;
///
/// let window = ProductionWindow::closed(2005, 2010);
/// assert!(window.covers(2005));
/// assert!(window.covers(2010));
/// assert!(!window.covers(2011));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionWindow {
    pub year_from: i32,
    pub month_from: Option<i32>,
    pub year_to: Option<i32>,
    pub month_to: Option<i32>,
}

impl ProductionWindow {
    #[must_use]
    pub const fn open(year_from: i32) -> Self {
        Self {
            year_from,
            month_from: None,
            year_to: None,
            month_to: None,
        }
    }

    #[must_use]
    pub const fn closed(year_from: i32, year_to: i32) -> Self {
        Self {
            year_from,
            month_from: None,
            year_to: Some(year_to),
            month_to: None,
        }
    }

    #[must_use]
    pub const fn is_open_ended(&self) -> bool {
        self.year_to.is_none()
    }

    #[must_use]
    pub const fn covers(&self, year: i32) -> bool {
        if self.year_from > year {
            return false;
        }
        match self.year_to {
            None => true,
            Some(year_to) => year <= year_to,
        }
    }

    /// A closed window must not end before it starts.
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        match self.year_to {
            None => true,
            Some(year_to) => self.year_from <= year_to,
        }
    }
}

/// Which part of the catalog a free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    All,
    Brands,
    Models,
    EngineVariants,
}

impl SearchScope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Brands => "brands",
            Self::Models => "models",
            Self::EngineVariants => "engine_variants",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "brands" | "brand" => Ok(Self::Brands),
            "models" | "model" => Ok(Self::Models),
            "engine_variants" | "variants" | "types" => Ok(Self::EngineVariants),
            other => Err(format!("Unknown search scope: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_window_covers_every_year_from_start() {
        let window = ProductionWindow::open(2010);
        assert!(window.is_open_ended());
        assert!(!window.covers(2009));
        assert!(window.covers(2010));
        assert!(window.covers(2042));
    }

    #[test]
    fn closed_window_bounds_are_inclusive() {
        let window = ProductionWindow::closed(2005, 2010);
        assert!(!window.covers(2004));
        assert!(window.covers(2005));
        assert!(window.covers(2010));
        assert!(!window.covers(2011));
    }

    #[test]
    fn inverted_window_is_not_well_formed() {
        assert!(!ProductionWindow::closed(2012, 2010).is_well_formed());
        assert!(ProductionWindow::closed(2010, 2010).is_well_formed());
        assert!(ProductionWindow::open(1990).is_well_formed());
    }

    #[test]
    fn scope_parses_aliases() {
        assert_eq!("".parse::<SearchScope>(), Ok(SearchScope::All));
        assert_eq!("Models".parse::<SearchScope>(), Ok(SearchScope::Models));
        assert_eq!(
            "types".parse::<SearchScope>(),
            Ok(SearchScope::EngineVariants)
        );
        assert!("parts".parse::<SearchScope>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ModelId::new(7)).unwrap();
        assert_eq!(json, "7");
        assert_eq!(BrandId::from(3).value(), 3);
    }
}
