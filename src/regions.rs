// src/regions.rs

use std::collections::HashMap;

/// Lookup of federal-subject names to numeric region codes.
///
/// Names are stored in their upper-cased canonical form and queries are
/// upper-cased before matching, so lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    by_name: HashMap<String, Region>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub code: u16,
    /// Autonomous okrug or oblast rather than a first-level subject.
    pub autonomy: bool,
}

/// (name, code, autonomy)
static RUSSIA: &[(&str, u16, bool)] = &[
    ("МОСКВА", 77, false),
    ("МОСКОВСКАЯ ОБЛАСТЬ", 50, false),
    ("АДЫГЕЯ РЕСПУБЛИКА", 1, false),
    ("АЛТАЙ РЕСПУБЛИКА", 4, false),
    ("АЛТАЙСКИЙ КРАЙ", 22, false),
    ("АМУРСКАЯ ОБЛАСТЬ", 28, false),
    ("АРХАНГЕЛЬСКАЯ ОБЛАСТЬ", 29, false),
    ("АСТРАХАНСКАЯ ОБЛАСТЬ", 30, false),
    ("БАШКОРТОСТАН РЕСПУБЛИКА", 2, false),
    ("БЕЛГОРОДСКАЯ ОБЛАСТЬ", 31, false),
    ("БРЯНСКАЯ ОБЛАСТЬ", 32, false),
    ("БУРЯТИЯ РЕСПУБЛИКА", 3, false),
    ("ВЛАДИМИРСКАЯ ОБЛАСТЬ", 33, false),
    ("ВОЛГОГРАДСКАЯ ОБЛАСТЬ", 34, false),
    ("ВОЛОГОДСКАЯ ОБЛАСТЬ", 35, false),
    ("ВОРОНЕЖСКАЯ ОБЛАСТЬ", 36, false),
    ("ДАГЕСТАН РЕСПУБЛИКА", 5, false),
    ("ЗАБАЙКАЛЬСКИЙ КРАЙ", 75, false),
    ("ИВАНОВСКАЯ ОБЛАСТЬ", 37, false),
    ("ИНГУШЕТИЯ РЕСПУБЛИКА", 6, false),
    ("ИРКУТСКАЯ ОБЛАСТЬ", 38, false),
    ("КАБАРДИНО-БАЛКАРСКАЯ РЕСПУБЛИКА", 7, false),
    ("КАЛИНИНГРАДСКАЯ ОБЛАСТЬ", 39, false),
    ("КАЛМЫКИЯ РЕСПУБЛИКА", 8, false),
    ("КАЛУЖСКАЯ ОБЛАСТЬ", 40, false),
    ("КАМЧАТСКИЙ КРАЙ", 41, false),
    ("КАРАЧАЕВО-ЧЕРКЕССКАЯ РЕСПУБЛИКА", 9, false),
    ("КАРЕЛИЯ РЕСПУБЛИКА", 10, false),
    ("КЕМЕРОВСКАЯ ОБЛАСТЬ", 42, false),
    ("КИРОВСКАЯ ОБЛАСТЬ", 43, false),
    ("КОМИ РЕСПУБЛИКА", 11, false),
    ("КОСТРОМСКАЯ ОБЛАСТЬ", 44, false),
    ("КРАСНОДАРСКИЙ КРАЙ", 23, false),
    ("КРАСНОЯРСКИЙ КРАЙ", 24, false),
    ("КРЫМ РЕСПУБЛИКА", 82, false),
    ("КУРГАНСКАЯ ОБЛАСТЬ", 45, false),
    ("КУРСКАЯ ОБЛАСТЬ", 46, false),
    ("ЛЕНИНГРАДСКАЯ ОБЛАСТЬ", 47, false),
    ("ЛИПЕЦКАЯ ОБЛАСТЬ", 48, false),
    ("МАГАДАНСКАЯ ОБЛАСТЬ", 49, false),
    ("МАРИЙ ЭЛ РЕСПУБЛИКА", 12, false),
    ("МОРДОВИЯ РЕСПУБЛИКА", 13, false),
    ("МУРМАНСКАЯ ОБЛАСТЬ", 51, false),
    ("НИЖЕГОРОДСКАЯ ОБЛАСТЬ", 52, false),
    ("НОВГОРОДСКАЯ ОБЛАСТЬ", 53, false),
    ("НОВОСИБИРСКАЯ ОБЛАСТЬ", 54, false),
    ("ОМСКАЯ ОБЛАСТЬ", 55, false),
    ("ОРЕНБУРГСКАЯ ОБЛАСТЬ", 56, false),
    ("ОРЛОВСКАЯ ОБЛАСТЬ", 57, false),
    ("ПЕНЗЕНСКАЯ ОБЛАСТЬ", 58, false),
    ("ПЕРМСКИЙ КРАЙ", 59, false),
    ("ПРИМОРСКИЙ КРАЙ", 25, false),
    ("ПСКОВСКАЯ ОБЛАСТЬ", 60, false),
    ("РОСТОВСКАЯ ОБЛАСТЬ", 61, false),
    ("РЯЗАНСКАЯ ОБЛАСТЬ", 62, false),
    ("САМАРСКАЯ ОБЛАСТЬ", 63, false),
    ("САНКТ-ПЕТЕРБУРГ", 78, false),
    ("САРАТОВСКАЯ ОБЛАСТЬ", 64, false),
    ("САХА (ЯКУТИЯ) РЕСПУБЛИКА", 14, false),
    ("САХАЛИНСКАЯ ОБЛАСТЬ", 65, false),
    ("СВЕРДЛОВСКАЯ ОБЛАСТЬ", 66, false),
    ("СЕВАСТОПОЛЬ", 92, false),
    ("СЕВЕРНАЯ ОСЕТИЯ - АЛАНИЯ РЕСПУБЛИКА", 15, false),
    ("СМОЛЕНСКАЯ ОБЛАСТЬ", 67, false),
    ("СТАВРОПОЛЬСКИЙ КРАЙ", 26, false),
    ("ТАМБОВСКАЯ ОБЛАСТЬ", 68, false),
    ("ТАТАРСТАН РЕСПУБЛИКА", 16, false),
    ("ТВЕРСКАЯ ОБЛАСТЬ", 69, false),
    ("ТОМСКАЯ ОБЛАСТЬ", 70, false),
    ("ТУЛЬСКАЯ ОБЛАСТЬ", 71, false),
    ("ТЫВА РЕСПУБЛИКА", 17, false),
    ("ТЮМЕНСКАЯ ОБЛАСТЬ", 72, false),
    ("УДМУРТСКАЯ РЕСПУБЛИКА", 18, false),
    ("ХАБАРОВСКИЙ КРАЙ", 27, false),
    ("ХАКАСИЯ РЕСПУБЛИКА", 19, false),
    ("ЧЕЛЯБИНСКАЯ ОБЛАСТЬ", 74, false),
    ("ЧЕЧЕНСКАЯ РЕСПУБЛИКА", 20, false),
    ("ЧУВАШИЯ РЕСПУБЛИКА", 21, false),
    ("ЯРОСЛАВСКАЯ ОБЛАСТЬ", 76, false),
    ("УЛЬЯНОВСКАЯ ОБЛАСТЬ", 73, false),
    ("НЕНЕЦКИЙ АВТОНОМНЫЙ ОКРУГ", 83, true),
    ("ХАНТЫ-МАНСИЙСКИЙ-ЮГРА АВТОНОМНЫЙ ОКРУГ", 86, true),
    ("ЯМАЛО-НЕНЕЦКИЙ АВТОНОМНЫЙ ОКРУГ", 89, true),
    ("ЕВРЕЙСКАЯ АВТОНОМНАЯ ОБЛАСТЬ", 79, true),
    ("ЧУКОТСКИЙ АВТОНОМНЫЙ ОКРУГ", 87, true),
];

impl RegionTable {
    /// Build a table from arbitrary entries. A later duplicate name replaces
    /// the earlier one, so every name maps to exactly one code.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u16, bool)>,
        S: AsRef<str>,
    {
        let by_name = entries
            .into_iter()
            .map(|(name, code, autonomy)| {
                let name = canonical(name.as_ref());
                (
                    name.clone(),
                    Region {
                        name,
                        code,
                        autonomy,
                    },
                )
            })
            .collect();
        Self { by_name }
    }

    /// The federal subjects of Russia as named in the PIndx tables.
    pub fn russia() -> Self {
        Self::new(RUSSIA.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Code and autonomy flag for `name`, `(0, false)` when unknown or empty.
    pub fn code_of(&self, name: &str) -> (u16, bool) {
        if name.trim().is_empty() {
            return (0, false);
        }
        self.by_name
            .get(&canonical(name))
            .map(|r| (r.code, r.autonomy))
            .unwrap_or((0, false))
    }

    /// Resolve a record's region code. Falls back to the autonomy name when
    /// the region name is empty.
    pub fn resolve(&self, region: &str, autonomy: &str) -> u16 {
        let name = if region.trim().is_empty() {
            autonomy
        } else {
            region
        };
        self.code_of(name).0
    }

    /// Canonical name for a code.
    pub fn name_of(&self, code: u16) -> Option<&str> {
        if code == 0 {
            return None;
        }
        self.by_name
            .values()
            .find(|r| r.code == code)
            .map(|r| r.name.as_str())
    }
}

fn canonical(name: &str) -> String {
    name.trim().to_uppercase()
}
