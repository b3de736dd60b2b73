//! Entity categories extracted by the entity plan
//!
//! Each category is a union of Wikidata "instance of" types plus the properties fetched as
//! optional columns. Labelled properties are entity references whose label is read from
//! `<name>Label`; unlabelled ones (dates) are read from `<name>` directly.

/// One optional property of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    /// Column and SPARQL variable name
    pub name: &'static str,
    /// Wikidata predicate, e.g. `wdt:P569`
    pub property: &'static str,
    pub labelled: bool,
}

impl PropertySpec {
    /// Result field carrying the property's value.
    pub fn field_name(&self) -> String {
        if self.labelled {
            format!("{}Label", self.name)
        } else {
            self.name.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCategory {
    pub key: &'static str,
    /// Output table name
    pub file_name: &'static str,
    /// Type tag given to every node of the category
    pub type_tag: &'static str,
    pub wikidata_types: &'static [&'static str],
    pub properties: &'static [PropertySpec],
}

const fn dated(name: &'static str, property: &'static str) -> PropertySpec {
    PropertySpec { name, property, labelled: false }
}

const fn labelled(name: &'static str, property: &'static str) -> PropertySpec {
    PropertySpec { name, property, labelled: true }
}

const INCEPTION: PropertySpec = dated("inception", "wdt:P571");
const COUNTRY: PropertySpec = labelled("country", "wdt:P17");
const COUNTRY_OF_ORIGIN: PropertySpec = labelled("country_of_origin", "wdt:P495");
const GENRE: PropertySpec = labelled("genre", "wdt:P136");

pub const CATEGORIES: &[EntityCategory] = &[
    EntityCategory {
        key: "humans",
        file_name: "humans.csv",
        type_tag: "Human",
        wikidata_types: &["wd:Q5"],
        properties: &[
            dated("birth_date", "wdt:P569"),
            labelled("place_of_birth", "wdt:P19"),
            labelled("occupation", "wdt:P106"),
        ],
    },
    EntityCategory {
        key: "musical_groups",
        file_name: "musical_groups.csv",
        type_tag: "MusicalGroup",
        wikidata_types: &[
            "wd:Q215380",   // musical group
            "wd:Q5741069",  // rock band
            "wd:Q25391823", // punk band
            "wd:Q9212979",  // musical duo
            "wd:Q56816954", // heavy metal band
            "wd:Q641066",   // girl band
            "wd:Q216337",   // boy band
            "wd:Q18127",    // record label
        ],
        properties: &[INCEPTION, GENRE, COUNTRY_OF_ORIGIN],
    },
    EntityCategory {
        key: "genres",
        file_name: "genres.csv",
        type_tag: "Genre",
        wikidata_types: &["wd:Q188451", "wd:Q1792379"],
        properties: &[INCEPTION, COUNTRY_OF_ORIGIN],
    },
    EntityCategory {
        key: "social_political_economic",
        file_name: "social_political_economic.csv",
        type_tag: "SocioPoliticalEntity",
        wikidata_types: &[
            "wd:Q41710",    // ethnic group
            "wd:Q16334295", // group of humans
            "wd:Q264965",   // subculture
            "wd:Q49773",    // social movement
            "wd:Q2198855",  // cultural movement
            "wd:Q12909644", // political ideology
            "wd:Q7210356",  // political organization
            "wd:Q43229",    // organization
            "wd:Q163740",   // nonprofit organization
            "wd:Q79913",    // non-governmental organization
            "wd:Q155271",   // think tank
            "wd:Q4830453",  // business
            "wd:Q7278",     // political party
            "wd:Q3048444",  // school of economic thought
            "wd:Q17524420", // aspect of history
            "wd:Q273120",   // protest
        ],
        properties: &[INCEPTION, COUNTRY],
    },
    EntityCategory {
        key: "religion_philosophy",
        file_name: "religion_philosophy.csv",
        type_tag: "Ideology",
        wikidata_types: &[
            "wd:Q9174",      // religion
            "wd:Q879146",    // Christian denomination
            "wd:Q123129246", // Christian denominational family
            "wd:Q995347",    // Christian movement
            "wd:Q5043",      // Christianity
            "wd:Q19097",     // sect
            "wd:Q13414953",  // religious denomination
            "wd:Q1826286",   // religious movement
            "wd:Q7257",      // ideology
            "wd:Q477544",    // new religious movement
            "wd:Q1530022",   // religious organization
            "wd:Q20643955",  // human biblical figure
            "wd:Q2915955",   // philosophical movement
            "wd:Q12765852",  // philosophical schools and traditions
            "wd:Q1387659",   // school of thought
        ],
        properties: &[INCEPTION],
    },
    EntityCategory {
        key: "art",
        file_name: "art.csv",
        type_tag: "Art",
        wikidata_types: &[
            "wd:Q3305213",  // painting
            "wd:Q860861",   // sculpture
            "wd:Q93184",    // drawing
            "wd:Q1792644",  // art style
            "wd:Q968159",   // art movement
            "wd:Q2736610",  // artistic school
            "wd:Q25679497", // art of an area
            "wd:Q1792379",  // art genre
            "wd:Q3326867",  // painting movement
            "wd:Q2198855",  // cultural movement
            "wd:Q667276",   // art exhibition
            "wd:Q12043905", // pastel painting
            "wd:Q4502119",  // art group
            "wd:Q1400264",  // artist collective
        ],
        properties: &[INCEPTION, COUNTRY],
    },
    EntityCategory {
        key: "media",
        file_name: "media.csv",
        type_tag: "Media",
        wikidata_types: &[
            "wd:Q11424",     // film
            "wd:Q202866",    // animated film
            "wd:Q201658",    // film genre
            "wd:Q5398426",   // television series
            "wd:Q581714",    // animated series
            "wd:Q117467246", // animated television series
            "wd:Q15416",     // television program
            "wd:Q7889",      // video game
            "wd:Q7058673",   // video game series
            "wd:Q659563",    // video game genre
            "wd:Q1643932",   // tabletop role-playing game
            "wd:Q7777573",   // theatrical genre
            "wd:Q838795",    // comic strip
            "wd:Q21198342",  // manga series
            "wd:Q277759",    // book series
            "wd:Q7725634",   // literary work
            "wd:Q47461344",  // written work
            "wd:Q5185279",   // poem
            "wd:Q223393",    // literary genre
            "wd:Q386724",    // work
            "wd:Q41298",     // magazine
            "wd:Q196600",    // media franchise
        ],
        properties: &[
            dated("publication_date", "wdt:P577"),
            labelled("author", "wdt:P50"),
            labelled("director", "wdt:P57"),
            GENRE,
        ],
    },
    EntityCategory {
        key: "language",
        file_name: "languages.csv",
        type_tag: "Language",
        wikidata_types: &[
            "wd:Q34770",   // language
            "wd:Q1288568", // modern language
            "wd:Q33742",   // natural language
            "wd:Q33215",   // constructed language
            "wd:Q1790577", // planned language
            "wd:Q25295",   // language family
            "wd:Q33384",   // dialect
            "wd:Q1208380", // dialect group
        ],
        properties: &[INCEPTION, COUNTRY],
    },
    EntityCategory {
        key: "cuisine",
        file_name: "cuisines.csv",
        type_tag: "Cuisine",
        wikidata_types: &[
            "wd:Q18291645", // cuisine by ethnic group
            "wd:Q1968435",  // national cuisine
            "wd:Q94951",    // regional cuisine
        ],
        properties: &[INCEPTION, COUNTRY],
    },
    EntityCategory {
        key: "technology",
        file_name: "technology.csv",
        type_tag: "Technology",
        wikidata_types: &[
            "wd:Q9143",     // programming language
            "wd:Q1144882",  // declarative programming language
            "wd:Q1993334",  // interpreted language
            "wd:Q187432",   // scripting language
            "wd:Q28920142", // array programming language
            "wd:Q21562092", // imperative programming language
            "wd:Q28922885", // procedural programming language
            "wd:Q899523",   // object-based language
            "wd:Q12772052", // multi-paradigm programming language
            "wd:Q3839507",  // functional programming language
            "wd:Q37045",    // markup language
            "wd:Q845739",   // query language
            "wd:Q65966993", // hypertext system
            "wd:Q47506",    // compiler
            "wd:Q7397",     // software
            "wd:Q341",      // free software
            "wd:Q1130645",  // open-source software
            "wd:Q14656",    // Unix-like operating system
            "wd:Q9135",     // operating system
            "wd:Q1074158",  // educational software
            "wd:Q132364",   // communication protocol
            "wd:Q15836568", // computer network protocol
            "wd:Q235557",   // file format
        ],
        properties: &[INCEPTION],
    },
];

/// Look a category up by key.
pub fn find(key: &str) -> Option<&'static EntityCategory> {
    CATEGORIES.iter().find(|c| c.key == key)
}

pub fn keys() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|c| c.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_ten_unique_categories() {
        assert_eq!(CATEGORIES.len(), 10);
        let keys: HashSet<_> = keys().collect();
        assert_eq!(keys.len(), 10);
        let files: HashSet<_> = CATEGORIES.iter().map(|c| c.file_name).collect();
        assert_eq!(files.len(), 10);
    }

    #[test]
    fn test_find() {
        let media = find("media").unwrap();
        assert_eq!(media.type_tag, "Media");
        assert_eq!(media.properties.len(), 4);
        assert!(find("planets").is_none());
    }

    #[test]
    fn test_field_names() {
        let humans = find("humans").unwrap();
        let fields: Vec<String> = humans.properties.iter().map(PropertySpec::field_name).collect();
        assert_eq!(fields, vec!["birth_date", "place_of_birthLabel", "occupationLabel"]);
    }
}
