//! Reference document the remote model is conditioned on
//!
//! The document is opaque to road-ai: it is handed to the provider once at
//! construction and never parsed locally.

use std::path::Path;

/// Summary of the Sultanate of Oman Highway Design Standards 2017, Volume 3
pub const OMAN_HIGHWAY_STANDARDS_2017: &str = r#"
DOCUMENT SUMMARY: Highway Design Standards 2017, Sultanate of Oman. Volume 3: Standard Specifications for Road & Bridge Construction.

TABLE OF CONTENTS (VOLUME 3):
1. GENERAL (Scope, Project Site, Contractor/Engineer Facilities, Site Control, Traffic Control, Submittals, etc.)
2. EARTHWORKS (Clearing/Grubbing, Roadway Excavation, Borrow Materials, Embankments, Sub-grade Construction, Pipe Trenches)
3. GRANULAR & STABILISED SUBBASE, BASECOURSE & STABILISED SUBGRADE
4. BITUMINOUS PAVEMENT (Materials, Prime/Tack Coats, Bituminous Courses, Base/Binder/Wearing Courses, Seal Coats, Repairs)
5. CONCRETE & CONCRETE STRUCTURES (Materials, Mixes, Reinforcing Steel, Prestressed Concrete)
6. STRUCTURAL STEEL & OTHER METAL WORK
7. PAINT
8. DRAINAGE (Pipe Culverts, Storm Sewers, Manholes, Drainage of Structures)
9. SLOPE PROTECTION & STABILISATION (Riprap, Gabions, Rock Bolts, Shotcrete, Ditch Lining)
10. PILING (General, Cast in Place, Precast, Steel Piles, Testing)
11. BRIDGE ACCESSORIES (Bearings, Expansion Joints, Parapets/Railings)
12. SIDEWALKS, PAVED AREAS & CURBS
13. SAFETY BARRIERS & FENCES
14. TRAFFIC SIGNS & ROAD MARKINGS
15. ROAD LIGHTING & ELECTRICAL INSTALLATIONS
16. LANDSCAPING AND IRRIGATION
17. PUMPING STATIONS
18. UTILITIES
19. PLANT & EQUIPMENT
20. STANDARD BILL OF QUANTITIES

SECTION HIGHLIGHTS:
- SECTION 1.1: Scope of Section - General requirements applying to all sections.
- SECTION 1.7: Control of Traffic - Maintenance of one-way traffic must provide lane >= 3.5m wide, length <= 500m. 
- SECTION 2.1: Clearing and Grubbing - Removal of vegetation/debris within fill width only.
- SECTION 2.3: Roadway Excavation - Classification includes Unclassified Excavation (silts, clays, sand, gravel, rock).
- SECTION 2.5: Embankments - Soil must meet max dry density >= 1.7 g/cu.cm (AASHTO T-180 Method D).
- SECTION 4.1: Bituminous Pavement - Coarse aggregate for wearing course must be 100% crushed stone from high quality Gabbro/Basalt.
- SECTION 5.1: Concrete - Minimum characteristic strength usually depends on class. Structural concrete samples: 1 per 100 cu.m placed.
- SECTION 5.2.3.4: Concrete Cover - Exposed to salt water: 100mm; Substructure against earth: 75mm; Exposed to weather: 60mm.
- SECTION 8.1.2.2: Precast Concrete Pipe - Manufacture to BS 5911-1 or ASTM C76-02 Class IV.
- SECTION 9.1: Riprap - Stone apparent specific gravity >= 2.5, absorption <= 6%.
- SECTION 10.1.3.7: Piling Tolerances - Position: 75mm in any direction; Verticality: 1 in 75 deviation.
- SECTION 14.1: Traffic Signs - Sign plates 3mm thick alloy aluminum. Warranty for sheeting: 9 years.
"#;

/// Greeting shown for a session without messages
pub const GREETING: &str = "I am a technical assistant grounded in the Sultanate of Oman Ministry of Transport Highway Design Standards 2017. How can I assist your engineering query today?";

/// Starter queries offered for an empty session
pub const SUGGESTED_QUERIES: [&str; 4] = [
    "Concrete cover requirements for marine exposure?",
    "Minimum lane width for 1-way construction traffic?",
    "Standard tolerances for cast-in-place piling?",
    "Soil density requirements for embankments?",
];

/// Build the system instruction sent with every request
pub fn system_instruction(document: &str) -> String {
    format!(
        "You are a technical assistant for highway and bridge construction engineers. \
Answer strictly from the reference document below, cite the section number you rely on, \
and say so plainly when the document does not cover the question.\n\n\
REFERENCE DOCUMENT:\n{}",
        document.trim()
    )
}

/// Load the reference document, falling back to the built-in summary
pub fn load_document(path: Option<&Path>) -> crate::Result<String> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                return Err(crate::Error::Config(format!(
                    "reference document {} is empty",
                    path.display()
                )));
            }
            Ok(content)
        }
        None => Ok(OMAN_HIGHWAY_STANDARDS_2017.to_string()),
    }
}
