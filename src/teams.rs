use crate::game::TeamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TeamColor {
    pub const NEUTRAL: TeamColor = TeamColor::hex(0x5a5a5a);

    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    /// Linear blend from `self` towards `to`; `t` is clamped to 0..=1.
    pub fn blend(self, to: TeamColor, t: f32) -> TeamColor {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        TeamColor {
            r: mix(self.r, to.r),
            g: mix(self.g, to.g),
            b: mix(self.b, to.b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TeamEntry {
    pub id: TeamId,
    pub name: &'static str,
    pub abbreviation: &'static str,
    pub primary: TeamColor,
    pub secondary: TeamColor,
}

const fn team(
    id: TeamId,
    name: &'static str,
    abbreviation: &'static str,
    primary: u32,
    secondary: u32,
) -> TeamEntry {
    TeamEntry {
        id,
        name,
        abbreviation,
        primary: TeamColor::hex(primary),
        secondary: TeamColor::hex(secondary),
    }
}

const TEAMS: &[TeamEntry] = &[
    team(108, "Los Angeles Angels", "LAA", 0x003263, 0xba0021),
    team(109, "Arizona Diamondbacks", "AZ", 0xa71930, 0xe3d4ad),
    team(110, "Baltimore Orioles", "BAL", 0x27251f, 0xdf4601),
    team(111, "Boston Red Sox", "BOS", 0xbd3039, 0x0c2340),
    team(112, "Chicago Cubs", "CHC", 0x0e3386, 0xcc3433),
    team(113, "Cincinnati Reds", "CIN", 0xc6011f, 0xffffff),
    team(114, "Cleveland Guardians", "CLE", 0x00385d, 0xe31937),
    team(115, "Colorado Rockies", "COL", 0x333366, 0xc4ced4),
    team(116, "Detroit Tigers", "DET", 0x0c2340, 0xfa4616),
    team(117, "Houston Astros", "HOU", 0x002d62, 0xeb6e1f),
    team(118, "Kansas City Royals", "KC", 0x004687, 0xbd9b60),
    team(119, "Los Angeles Dodgers", "LAD", 0x005a9c, 0xef3e42),
    team(120, "Washington Nationals", "WSH", 0xab0003, 0x14225a),
    team(121, "New York Mets", "NYM", 0x002d72, 0xff5910),
    team(133, "Athletics", "ATH", 0x003831, 0xefb21e),
    team(134, "Pittsburgh Pirates", "PIT", 0x27251f, 0xfdb827),
    team(135, "San Diego Padres", "SD", 0x2f241d, 0xffc425),
    team(136, "Seattle Mariners", "SEA", 0x0c2c56, 0x005c5c),
    team(137, "San Francisco Giants", "SF", 0xfd5a1e, 0x27251f),
    team(138, "St. Louis Cardinals", "STL", 0xc41e3a, 0x0c2340),
    team(139, "Tampa Bay Rays", "TB", 0x092c5c, 0x8fbce6),
    team(140, "Texas Rangers", "TEX", 0x003278, 0xc0111f),
    team(141, "Toronto Blue Jays", "TOR", 0x134a8e, 0x1d2d5c),
    team(142, "Minnesota Twins", "MIN", 0x002b5c, 0xd31145),
    team(143, "Philadelphia Phillies", "PHI", 0xe81828, 0x002d72),
    team(144, "Atlanta Braves", "ATL", 0xce1141, 0x13274f),
    team(145, "Chicago White Sox", "CWS", 0x27251f, 0xc4ced4),
    team(146, "Miami Marlins", "MIA", 0x00a3e0, 0xef3340),
    team(147, "New York Yankees", "NYY", 0x0c2340, 0xe4002b),
    team(158, "Milwaukee Brewers", "MIL", 0x12284b, 0xffc52f),
];

pub fn by_id(id: TeamId) -> Option<&'static TeamEntry> {
    TEAMS.iter().find(|t| t.id == id)
}

/// Look a team up by full name, abbreviation, or nickname (case-insensitive).
pub fn find(query: &str) -> Option<&'static TeamEntry> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    TEAMS.iter().find(|t| {
        t.name.eq_ignore_ascii_case(query)
            || t.abbreviation.eq_ignore_ascii_case(query)
            || t.name
                .rsplit(' ')
                .next()
                .is_some_and(|nick| nick.eq_ignore_ascii_case(query))
    })
}

/// Background/foreground pair for a team row, neutral when the team is unknown.
pub fn colors(id: Option<TeamId>) -> (TeamColor, TeamColor) {
    id.and_then(by_id)
        .map(|t| (t.primary, t.secondary))
        .unwrap_or((TeamColor::NEUTRAL, TeamColor::hex(0xffffff)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_accepts_name_abbreviation_and_nickname() {
        assert_eq!(find("Detroit Tigers").map(|t| t.id), Some(116));
        assert_eq!(find("nyy").map(|t| t.id), Some(147));
        assert_eq!(find("Astros").map(|t| t.id), Some(117));
        assert!(find("").is_none());
        assert!(find("Montreal Expos").is_none());
    }

    #[test]
    fn blend_endpoints() {
        let a = TeamColor::hex(0x000000);
        let b = TeamColor::hex(0xff8000);
        assert_eq!(a.blend(b, 0.0), a);
        assert_eq!(a.blend(b, 1.0), b);
        assert_eq!(a.blend(b, 2.0), b);
    }
}
