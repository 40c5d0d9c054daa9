use crate::domain::{CompanyId, NewTechnician, PhotoRef};

struct DemoTechnician {
    first_name: &'static str,
    last_name: &'static str,
    title: &'static str,
    photo: &'static str,
    bio: &'static str,
    certifications: &'static [&'static str],
    years_experience: u32,
}

const DEMO_ROSTER: [DemoTechnician; 3] = [
    DemoTechnician {
        first_name: "Sarah",
        last_name: "Johnson",
        title: "Senior HVAC Technician",
        photo: "https://images.pexels.com/photos/774909/pexels-photo-774909.jpeg?auto=compress&cs=tinysrgb&w=400",
        bio: "With 12 years of experience in heating and cooling systems, Sarah specializes in residential and commercial HVAC installations and repairs. She holds multiple EPA certifications and is known for her attention to detail and customer service excellence.",
        certifications: &[
            "EPA Universal Certification",
            "NATE Certified",
            "OSHA Safety Certified",
            "Residential Load Calculation",
        ],
        years_experience: 12,
    },
    DemoTechnician {
        first_name: "Michael",
        last_name: "Chen",
        title: "Master Plumber",
        photo: "https://images.pexels.com/photos/1516680/pexels-photo-1516680.jpeg?auto=compress&cs=tinysrgb&w=400",
        bio: "Michael is a licensed master plumber with extensive experience in both residential and commercial plumbing. He specializes in complex pipe installations, water heater repairs, and emergency plumbing services.",
        certifications: &[
            "Master Plumber License",
            "Backflow Prevention Certified",
            "Gas Line Installation Certified",
        ],
        years_experience: 15,
    },
    DemoTechnician {
        first_name: "Jessica",
        last_name: "Martinez",
        title: "Licensed Electrician",
        photo: "https://images.pexels.com/photos/1181686/pexels-photo-1181686.jpeg?auto=compress&cs=tinysrgb&w=400",
        bio: "Jessica brings 8 years of electrical expertise to every job. She specializes in residential wiring, panel upgrades, and smart home installations. Safety and code compliance are her top priorities.",
        certifications: &[
            "Journeyman Electrician License",
            "Smart Home Installation Certified",
            "Solar Panel Installation",
        ],
        years_experience: 8,
    },
];

/// Sample roster used to populate an empty dashboard.
pub(crate) fn demo_technicians(company_id: CompanyId) -> Vec<NewTechnician> {
    DEMO_ROSTER
        .iter()
        .map(|demo| NewTechnician {
            company_id,
            first_name: demo.first_name.to_string(),
            last_name: demo.last_name.to_string(),
            title: demo.title.to_string(),
            photo: Some(PhotoRef(demo.photo.to_string())),
            bio: Some(demo.bio.to_string()),
            certifications: Some(
                demo.certifications
                    .iter()
                    .map(|cert| cert.to_string())
                    .collect(),
            ),
            years_experience: Some(demo.years_experience),
            is_active: true,
        })
        .collect()
}
