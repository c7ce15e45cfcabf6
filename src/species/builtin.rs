//! Profiles shipped with batcall

use crate::types::{ReferenceLink, SpeciesProfile};

/// Default fallback label
pub const DEFAULT_FALLBACK: &str = "Big Brown Bat";

fn link(title: &str, url: &str) -> ReferenceLink {
    ReferenceLink {
        title: title.to_string(),
        url: url.to_string(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn profiles() -> Vec<SpeciesProfile> {
    vec![
        SpeciesProfile {
            label: "Big Brown Bat".to_string(),
            scientific_name: "Eptesicus fuscus".to_string(),
            description: "One of the most common bats in North America. An effective \
                          hunter that catches insects in flight by echolocation, \
                          recognisable by its large size and brown fur."
                .to_string(),
            habitat: "Urban areas, forests, parks, and agricultural regions".to_string(),
            diet: "Beetles, moths, flies, and other flying insects".to_string(),
            size: "10-13 cm body length, 32-35 cm wingspan".to_string(),
            call_frequency: "25-30 kHz".to_string(),
            conservation_status: "Least Concern".to_string(),
            facts: strings(&[
                "Can live up to 30 years in the wild",
                "Hibernates in caves, mines, and buildings during winter",
                "Females form maternity colonies of 20-300 individuals",
                "Can eat up to half its body weight in insects each night",
            ]),
            links: vec![
                link("Wikipedia", "https://en.wikipedia.org/wiki/Big_brown_bat"),
                link("Bat Conservation International", "https://www.batcon.org"),
                link("iNaturalist", "https://www.inaturalist.org"),
            ],
        },
        SpeciesProfile {
            label: "Little Brown Bat".to_string(),
            scientific_name: "Myotis lucifugus".to_string(),
            description: "A small bat found throughout much of North America. An \
                          efficient hunter that plays a large part in keeping insect \
                          populations in check."
                .to_string(),
            habitat: "Near water sources, forests, and urban areas".to_string(),
            diet: "Small flying insects, especially mosquitoes and midges".to_string(),
            size: "8-9.5 cm body length, 22-27 cm wingspan".to_string(),
            call_frequency: "40-80 kHz".to_string(),
            conservation_status: "Near Threatened".to_string(),
            facts: strings(&[
                "One of the most studied bat species in North America",
                "Can catch over 1,000 mosquitoes in an hour",
                "Uses torpor to conserve energy during cold periods",
                "Severely affected by White-nose Syndrome",
            ]),
            links: vec![
                link("Wikipedia", "https://en.wikipedia.org/wiki/Little_brown_bat"),
                link("U.S. Fish & Wildlife Service", "https://www.fws.gov"),
                link("Bat Conservation International", "https://www.batcon.org"),
            ],
        },
    ]
}
