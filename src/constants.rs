/// Integer scale factor for all odds values: a 2.5x multiplier is 25000.
pub const ODDS_DIVISOR: u32 = 10_000;

/// Atoms per coin.
pub const COIN: i64 = 100_000_000;

/// Spread and total points are stored in quarter-point units (points * 100,
/// residues 0/25/50/75) so half- and quarter-lines are exact integers.
pub const POINT_SCALE: i32 = 100;

/// Upper bound on parlay size, single bets included.
pub const MAX_PARLAY_LEGS: usize = 5;

/// Enum for mapping namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MappingKind {
    Sport = 1,
    Round = 2,
    Team = 3,
    Tournament = 4,
    IndividualSport = 5,
    Contender = 6,
}

impl MappingKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Sport),
            2 => Some(Self::Round),
            3 => Some(Self::Team),
            4 => Some(Self::Tournament),
            5 => Some(Self::IndividualSport),
            6 => Some(Self::Contender),
            _ => None,
        }
    }
}

/// Enum for peerless bet outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Outcome {
    MoneyLineHome = 1,
    MoneyLineAway = 2,
    MoneyLineDraw = 3,
    SpreadHome = 4,
    SpreadAway = 5,
    TotalOver = 6,
    TotalUnder = 7,
}

impl Outcome {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::MoneyLineHome),
            2 => Some(Self::MoneyLineAway),
            3 => Some(Self::MoneyLineDraw),
            4 => Some(Self::SpreadHome),
            5 => Some(Self::SpreadAway),
            6 => Some(Self::TotalOver),
            7 => Some(Self::TotalUnder),
            _ => None,
        }
    }
}

/// Enum for posted result kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultKind {
    Standard = 1,
    EventRefund = 2,
    MoneyLineRefund = 3,
    SpreadsRefund = 4,
    TotalsRefund = 5,
    EventClosed = 6,
}

impl ResultKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Standard),
            2 => Some(Self::EventRefund),
            3 => Some(Self::MoneyLineRefund),
            4 => Some(Self::SpreadsRefund),
            5 => Some(Self::TotalsRefund),
            6 => Some(Self::EventClosed),
            _ => None,
        }
    }
}

/// Enum for the settled state of a bet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BetResult {
    Unknown = 0,
    Win = 1,
    Lose = 2,
    Refund = 3,
    PartialWin = 4,
    PartialLose = 5,
}

impl BetResult {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Unknown),
            1 => Some(Self::Win),
            2 => Some(Self::Lose),
            3 => Some(Self::Refund),
            4 => Some(Self::PartialWin),
            5 => Some(Self::PartialLose),
            _ => None,
        }
    }
}

/// Enum for field-event markets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldMarket {
    Outright = 1,
    Place = 2,
    Show = 3,
}

impl FieldMarket {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Outright),
            2 => Some(Self::Place),
            3 => Some(Self::Show),
            _ => None,
        }
    }
}

/// Enum for field result kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldResultKind {
    Standard = 1,
    Refund = 2,
    Closed = 3,
}

impl FieldResultKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Standard),
            2 => Some(Self::Refund),
            3 => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Finishing places in a field result. 0 = did not finish.
pub const PLACE_DNF: u8 = 0;
pub const PLACE_FIRST: u8 = 1;
pub const PLACE_SECOND: u8 = 2;
pub const PLACE_THIRD: u8 = 3;
/// Sentinel marking a single contender as individually refunded.
pub const PLACE_REFUND: u8 = 255;

/// Enum for payout-info record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PayoutKind {
    BettingPayout = 1,
    BettingRefund = 2,
    BettingReward = 3,
    ChainGamesPayout = 4,
    ChainGamesRefund = 5,
    ChainGamesReward = 6,
    QuickGamesPayout = 7,
    QuickGamesRefund = 8,
    QuickGamesReward = 9,
}

impl PayoutKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::BettingPayout),
            2 => Some(Self::BettingRefund),
            3 => Some(Self::BettingReward),
            4 => Some(Self::ChainGamesPayout),
            5 => Some(Self::ChainGamesRefund),
            6 => Some(Self::ChainGamesReward),
            7 => Some(Self::QuickGamesPayout),
            8 => Some(Self::QuickGamesRefund),
            9 => Some(Self::QuickGamesReward),
            _ => None,
        }
    }
}

/// Enum for quick game kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QuickGameKind {
    Dice = 0,
}

impl QuickGameKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Dice),
            _ => None,
        }
    }
}
