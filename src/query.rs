//! Read-only query surface over the betting store, mirroring the node's
//! RPC shapes. Results are plain serializable views; transport is the
//! caller's concern.

use serde::Serialize;

use crate::constants::{MappingKind, Outcome};
use crate::error::Result;
use crate::params::ChainParams;
use crate::state::bet::{BetKey, BetRecord};
use crate::state::chain_games::{ChainGamesBetRecord, ChainGamesEventRecord};
use crate::state::event::EventRecord;
use crate::state::field::FieldEventRecord;
use crate::state::mapping::{MappingKey, MappingRecord};
use crate::state::payout_info::PayoutInfoRecord;
use crate::state::result::ResultRecord;
use crate::store::BettingStore;
use crate::types::{Amount, OutPoint};

#[derive(Debug, Clone, Serialize)]
pub struct MappingView {
    pub id: u32,
    pub name: String,
}

/// Mapping lookup by id.
pub fn get_mapping(
    store: &BettingStore,
    params: &ChainParams,
    kind: MappingKind,
    id: u32,
) -> Result<Option<MappingView>> {
    let record: Option<MappingRecord> =
        store.mappings.read(&params.ser_ctx(), &MappingKey::new(kind, id))?;
    Ok(record.map(|r| MappingView { id, name: r.name }))
}

/// Reverse mapping lookup by exact name.
pub fn find_mapping_id(
    store: &BettingStore,
    params: &ChainParams,
    kind: MappingKind,
    name: &str,
) -> Result<Option<u32>> {
    let all: Vec<(MappingKey, MappingRecord)> = store.mappings.scan_all(&params.ser_ctx())?;
    Ok(all.into_iter().find(|(k, r)| k.kind == kind && r.name == name).map(|(k, _)| k.id))
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketLiabilityView {
    pub odds: u32,
    pub bets: u32,
    pub liability: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLiabilityView {
    pub event_id: u32,
    pub start_time: u64,
    pub resulted: bool,
    pub moneyline_home: MarketLiabilityView,
    pub moneyline_away: MarketLiabilityView,
    pub moneyline_draw: MarketLiabilityView,
    pub spread_home: MarketLiabilityView,
    pub spread_away: MarketLiabilityView,
    pub total_over: MarketLiabilityView,
    pub total_under: MarketLiabilityView,
}

fn liability_view(event: &EventRecord, outcome: Outcome) -> MarketLiabilityView {
    let tally = match outcome {
        Outcome::MoneyLineHome => &event.tally.ml_home,
        Outcome::MoneyLineAway => &event.tally.ml_away,
        Outcome::MoneyLineDraw => &event.tally.ml_draw,
        Outcome::SpreadHome => &event.tally.spread_home,
        Outcome::SpreadAway => &event.tally.spread_away,
        Outcome::TotalOver => &event.tally.total_over,
        Outcome::TotalUnder => &event.tally.total_under,
    };
    MarketLiabilityView {
        odds: event.base.odds_for(outcome),
        bets: tally.bets,
        liability: tally.liability,
    }
}

/// Liability report for one event.
pub fn event_liability(
    store: &BettingStore,
    params: &ChainParams,
    event_id: u32,
) -> Result<Option<EventLiabilityView>> {
    let ctx = params.ser_ctx();
    let Some(event) = store.events.read::<_, EventRecord>(&ctx, &event_id)? else {
        return Ok(None);
    };
    Ok(Some(EventLiabilityView {
        event_id,
        start_time: event.base.start_time,
        resulted: store.results.exists(&event_id),
        moneyline_home: liability_view(&event, Outcome::MoneyLineHome),
        moneyline_away: liability_view(&event, Outcome::MoneyLineAway),
        moneyline_draw: liability_view(&event, Outcome::MoneyLineDraw),
        spread_home: liability_view(&event, Outcome::SpreadHome),
        spread_away: liability_view(&event, Outcome::SpreadAway),
        total_over: liability_view(&event, Outcome::TotalOver),
        total_under: liability_view(&event, Outcome::TotalUnder),
    }))
}

/// Liability reports for every event, open ones first by start time.
pub fn all_event_liabilities(
    store: &BettingStore,
    params: &ChainParams,
) -> Result<Vec<EventLiabilityView>> {
    let all: Vec<(u32, EventRecord)> = store.events.scan_all(&params.ser_ctx())?;
    let mut views = Vec::with_capacity(all.len());
    for (event_id, _) in all {
        if let Some(view) = event_liability(store, params, event_id)? {
            views.push(view);
        }
    }
    Ok(views)
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldContenderLiabilityView {
    pub contender_id: u32,
    pub outright_odds: u32,
    pub outright_bets: u32,
    pub outright_liability: Amount,
    pub place_odds: u32,
    pub place_bets: u32,
    pub place_liability: Amount,
    pub show_odds: u32,
    pub show_bets: u32,
    pub show_liability: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldEventLiabilityView {
    pub event_id: u32,
    pub resulted: bool,
    pub contenders: Vec<FieldContenderLiabilityView>,
}

/// Liability report for one field event.
pub fn field_event_liability(
    store: &BettingStore,
    params: &ChainParams,
    event_id: u32,
) -> Result<Option<FieldEventLiabilityView>> {
    let ctx = params.ser_ctx();
    let Some(event) = store.field_events.read::<_, FieldEventRecord>(&ctx, &event_id)? else {
        return Ok(None);
    };
    Ok(Some(FieldEventLiabilityView {
        event_id,
        resulted: store.field_results.exists(&event_id),
        contenders: event
            .contenders
            .iter()
            .map(|(id, c)| FieldContenderLiabilityView {
                contender_id: *id,
                outright_odds: c.outright_odds,
                outright_bets: c.outright_bets,
                outright_liability: c.outright_liability,
                place_odds: c.place_odds,
                place_bets: c.place_bets,
                place_liability: c.place_liability,
                show_odds: c.show_odds,
                show_bets: c.show_bets,
                show_liability: c.show_liability,
            })
            .collect(),
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub event_id: u32,
    pub start_time: u64,
    pub sport: u32,
    pub tournament: u32,
    pub home_team: u32,
    pub away_team: u32,
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
}

/// Events without a posted result; `include_expired` keeps events whose
/// start time already passed.
pub fn list_events(
    store: &BettingStore,
    params: &ChainParams,
    now: u64,
    include_expired: bool,
) -> Result<Vec<EventView>> {
    let all: Vec<(u32, EventRecord)> = store.events.scan_all(&params.ser_ctx())?;
    Ok(all
        .into_iter()
        .filter(|(id, ev)| {
            !store.results.exists(id) && (include_expired || ev.base.start_time > now)
        })
        .map(|(id, ev)| EventView {
            event_id: id,
            start_time: ev.base.start_time,
            sport: ev.base.sport,
            tournament: ev.base.tournament,
            home_team: ev.base.home_team,
            away_team: ev.base.away_team,
            home_odds: ev.base.home_odds,
            away_odds: ev.base.away_odds,
            draw_odds: ev.base.draw_odds,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct BetView {
    pub height: u32,
    pub outpoint: String,
    pub player: String,
    pub amount: Amount,
    pub legs: Vec<(u32, u8)>,
    pub completed: bool,
    pub result: u8,
    pub payout: Amount,
    pub payout_height: u32,
}

/// Peerless bets keyed in `[from_height, to_height]`.
pub fn list_bets(
    store: &BettingStore,
    params: &ChainParams,
    from_height: u32,
    to_height: u32,
    include_completed: bool,
) -> Result<Vec<BetView>> {
    let entries: Vec<(BetKey, BetRecord)> =
        store.bets.scan_from(&params.ser_ctx(), &BetKey::range_start(from_height))?;
    Ok(entries
        .into_iter()
        .take_while(|(k, _)| k.height <= to_height)
        .filter(|(_, b)| include_completed || !b.completed)
        .map(|(k, b)| BetView {
            height: k.height,
            outpoint: k.out.to_string(),
            player: b.player.to_string(),
            amount: b.amount,
            legs: b.legs.iter().map(|l| (l.event_id, l.outcome as u8)).collect(),
            completed: b.completed,
            result: b.result as u8,
            payout: b.payout,
            payout_height: b.payout_height,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutInfoView {
    pub bet_height: u32,
    pub bet_outpoint: String,
    pub kind: u8,
}

fn info_view(info: &PayoutInfoRecord) -> PayoutInfoView {
    PayoutInfoView {
        bet_height: info.bet_key.height,
        bet_outpoint: info.bet_key.out.to_string(),
        kind: info.kind as u8,
    }
}

/// Payout info for one bet outpoint.
pub fn payout_info_for(
    store: &BettingStore,
    params: &ChainParams,
    height: u32,
    out: OutPoint,
) -> Result<Option<PayoutInfoView>> {
    let record: Option<PayoutInfoRecord> =
        store.payout_infos.read(&params.ser_ctx(), &BetKey::new(height, out))?;
    Ok(record.map(|r| info_view(&r)))
}

/// Every payout info recorded for bets keyed at or above `height`.
pub fn payout_infos_since(
    store: &BettingStore,
    params: &ChainParams,
    height: u32,
) -> Result<Vec<PayoutInfoView>> {
    let entries: Vec<(BetKey, PayoutInfoRecord)> =
        store.payout_infos.scan_from(&params.ser_ctx(), &BetKey::range_start(height))?;
    Ok(entries.iter().map(|(_, r)| info_view(r)).collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainGamesInfoView {
    pub event_id: u32,
    pub entry_fee: u32,
    pub open_tickets: u32,
    pub pot: Amount,
    pub resulted: bool,
}

/// Lottery state: entry fee, open ticket count and current pot.
pub fn chain_games_info(
    store: &BettingStore,
    params: &ChainParams,
    event_id: u32,
) -> Result<Option<ChainGamesInfoView>> {
    let ctx = params.ser_ctx();
    let Some(event) = store.cg_events.read::<_, ChainGamesEventRecord>(&ctx, &event_id)? else {
        return Ok(None);
    };
    let tickets: Vec<(BetKey, ChainGamesBetRecord)> = store.cg_bets.scan_all(&ctx)?;
    let open: Vec<&ChainGamesBetRecord> = tickets
        .iter()
        .map(|(_, b)| b)
        .filter(|b| b.event_id == event_id && !b.completed)
        .collect();
    Ok(Some(ChainGamesInfoView {
        event_id,
        entry_fee: event.entry_fee,
        open_tickets: open.len() as u32,
        pot: open.iter().map(|b| b.amount).sum(),
        resulted: store.cg_results.exists(&event_id),
    }))
}

/// Posted result lookup.
pub fn get_result(
    store: &BettingStore,
    params: &ChainParams,
    event_id: u32,
) -> Result<Option<ResultRecord>> {
    store.results.read(&params.ser_ctx(), &event_id)
}
