//! Wire format for the `/solve` endpoint: the JSON Auction request and
//! Solution response shapes, and the conversion into/out of the domain
//! types the solver crates actually operate on. Kept colocated with the
//! route handler rather than a separate `*-dto` crate since this binary is
//! the only consumer, matching `solvers-dto`'s job but without a crate
//! boundary nothing else needs.

use {
    alloy_primitives::U256,
    eth::{OrderUid, TokenAddress},
    pools::{Kind as PoolKind, Pool, PoolAddress},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

#[derive(Debug, thiserror::Error)]
pub enum DtoError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("amount {0:?} is not a plain decimal uint256 string")]
    InvalidAmount(String),
    #[error("unknown liquidity kind: {0}")]
    UnknownLiquidityKind(String),
    #[error("invalid token address: {0}")]
    InvalidToken(String),
    #[error("invalid order uid: {0}")]
    InvalidUid(String),
}

/// Parses a decimal-string uint256, rejecting the `0x...`/scientific-notation
/// forms some APIs accept, matching `solvers-dto`'s plain-decimal
/// convention.
fn parse_amount(s: &str) -> Result<U256, DtoError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DtoError::InvalidAmount(s.to_owned()));
    }
    U256::from_str_radix(s, 10).map_err(|_| DtoError::InvalidAmount(s.to_owned()))
}

fn parse_token(s: &str) -> Result<TokenAddress, DtoError> {
    s.parse().map_err(|_| DtoError::InvalidToken(s.to_owned()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub uid: String,
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: String,
    pub buy_amount: String,
    pub kind: OrderKindDto,
    pub partially_fillable: bool,
    pub valid_to: u32,
    pub fee_amount: String,
    pub owner: String,
    /// Balance-sourcing hints consumed by the settlement executor, not by
    /// the pure solve pipeline; accepted and ignored here.
    #[serde(default)]
    pub sell_token_balance: Option<String>,
    #[serde(default)]
    pub buy_token_balance: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKindDto {
    Sell,
    Buy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LiquidityKindDto {
    ConstantProduct,
    WeightedProduct,
    Stable,
    #[serde(rename = "KyberDMM")]
    KyberDmm,
    #[serde(rename = "DODOV2")]
    DodoV2,
    Concentrated,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityDto {
    pub kind: LiquidityKindDto,
    pub router: String,
    pub tokens: Vec<String>,
    pub reserves: Vec<String>,
    pub gas_estimate: u64,
    pub weights: Option<Vec<String>>,
    pub amplification: Option<u32>,
    /// Fee in basis points, applied to the input side. Required for every
    /// variant except `DODOV2`, which prices purely off `oracle_price`/`k`.
    pub fee_bps: Option<u32>,
    pub oracle_price: Option<String>,
    pub k: Option<String>,
    pub base_target: Option<String>,
    pub quote_target: Option<String>,
    pub sqrt_price_x96: Option<String>,
    pub within_tick_cap: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDto {
    pub id: String,
    pub orders: Vec<OrderDto>,
    pub liquidity: Vec<LiquidityDto>,
    pub effective_gas_price: String,
    pub deadline: String,
    #[serde(default)]
    pub prices: HashMap<String, String>,
    #[serde(default)]
    pub surplus_capturing_jit_order_owners: Vec<String>,
}

fn router_to_pool_address(router: &str) -> Result<PoolAddress, DtoError> {
    let token = parse_token(router)?;
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(token.as_address().as_slice());
    Ok(PoolAddress(bytes))
}

fn to_order(dto: OrderDto) -> Result<order::Order, DtoError> {
    Ok(order::Order {
        uid: dto.uid.parse().map_err(|_| DtoError::InvalidUid(dto.uid.clone()))?,
        sell_token: parse_token(&dto.sell_token)?,
        buy_token: parse_token(&dto.buy_token)?,
        sell_amount: parse_amount(&dto.sell_amount)?,
        buy_amount: parse_amount(&dto.buy_amount)?,
        kind: match dto.kind {
            OrderKindDto::Sell => order::Kind::Sell,
            OrderKindDto::Buy => order::Kind::Buy,
        },
        partially_fillable: dto.partially_fillable,
        valid_to: dto.valid_to,
        fee_amount: parse_amount(&dto.fee_amount)?,
        owner: parse_token(&dto.owner)?,
    })
}

fn to_pool(dto: LiquidityDto) -> Result<Pool, DtoError> {
    let address = router_to_pool_address(&dto.router)?;
    let tokens = dto.tokens.iter().map(|t| parse_token(t)).collect::<Result<Vec<_>, _>>()?;
    let reserves = dto.reserves.iter().map(|r| parse_amount(r)).collect::<Result<Vec<_>, _>>()?;
    let fee_bps = |field: &'static str| dto.fee_bps.ok_or(DtoError::MissingField(field));

    let kind = match dto.kind {
        LiquidityKindDto::ConstantProduct | LiquidityKindDto::KyberDmm => {
            PoolKind::ConstantProduct(pools::ConstantProduct { fee_bps: fee_bps("feeBps")? })
        }
        LiquidityKindDto::WeightedProduct => {
            let weights = dto
                .weights
                .ok_or(DtoError::MissingField("weights"))?
                .iter()
                .map(|w| parse_amount(w))
                .collect::<Result<Vec<_>, _>>()?;
            PoolKind::Weighted(pools::Weighted { fee_bps: fee_bps("feeBps")?, weights })
        }
        LiquidityKindDto::Stable => PoolKind::Stable(pools::Stable {
            amplification: dto.amplification.ok_or(DtoError::MissingField("amplification"))?,
            fee_bps: fee_bps("feeBps")?,
        }),
        LiquidityKindDto::DodoV2 => {
            let oracle_price = parse_amount(dto.oracle_price.as_deref().ok_or(DtoError::MissingField("oraclePrice"))?)?;
            let k = parse_amount(dto.k.as_deref().ok_or(DtoError::MissingField("k"))?)?;
            let base_reserve = *reserves.first().ok_or(DtoError::MissingField("reserves[0]"))?;
            let quote_reserve = *reserves.get(1).ok_or(DtoError::MissingField("reserves[1]"))?;
            let base_target = match dto.base_target {
                Some(v) => parse_amount(&v)?,
                None => base_reserve,
            };
            let quote_target = match dto.quote_target {
                Some(v) => parse_amount(&v)?,
                None => quote_reserve,
            };
            let r_state = if base_reserve == base_target {
                pools::RState::One
            } else if base_reserve < base_target {
                pools::RState::AboveOne
            } else {
                pools::RState::BelowOne
            };
            PoolKind::Pmm(pools::Pmm {
                oracle_price,
                k,
                base_reserve,
                quote_reserve,
                base_target,
                quote_target,
                r_state,
                fee_bps: fee_bps("feeBps")?,
            })
        }
        LiquidityKindDto::Concentrated => PoolKind::Concentrated(pools::Concentrated {
            sqrt_price_x96: parse_amount(dto.sqrt_price_x96.as_deref().ok_or(DtoError::MissingField("sqrtPriceX96"))?)?,
            within_tick_cap: parse_amount(
                dto.within_tick_cap.as_deref().ok_or(DtoError::MissingField("withinTickCap"))?,
            )?,
            fee_bps: fee_bps("feeBps")?,
        }),
    };

    Ok(Pool { address, tokens, reserves, gas_estimate: dto.gas_estimate, kind })
}

pub struct ParsedAuction {
    pub orders: Vec<order::Order>,
    pub pools: Vec<Pool>,
    pub native_prices: HashMap<TokenAddress, U256>,
    pub gas_price: eth::GasPrice,
}

pub fn to_domain(dto: AuctionDto) -> Result<ParsedAuction, DtoError> {
    let orders = dto.orders.into_iter().map(to_order).collect::<Result<Vec<_>, _>>()?;
    let pools = dto.liquidity.into_iter().map(to_pool).collect::<Result<Vec<_>, _>>()?;
    let native_prices = dto
        .prices
        .into_iter()
        .map(|(token, price)| Ok((parse_token(&token)?, parse_amount(&price)?)))
        .collect::<Result<HashMap<_, _>, DtoError>>()?;
    let gas_price = eth::GasPrice(parse_amount(&dto.effective_gas_price)?);
    Ok(ParsedAuction { orders, pools, native_prices, gas_price })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub kind: &'static str,
    pub order: OrderUid,
    pub executed_amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDto {
    pub kind: &'static str,
    pub internalize: bool,
    pub input_token: TokenAddress,
    pub output_token: TokenAddress,
    pub input_amount: String,
    pub output_amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionDto {
    pub id: u64,
    pub prices: HashMap<String, String>,
    pub trades: Vec<TradeDto>,
    pub interactions: Vec<InteractionDto>,
    pub gas: u64,
    pub score: String,
}

#[derive(Debug, Serialize)]
pub struct SolveResponseDto {
    pub solutions: Vec<SolutionDto>,
}

/// Derives the wire-level `prices` map from a solution's trades: the
/// cross-multiplication trick `price[sell] * sell_amount == price[buy] *
/// buy_amount` gives each token an arbitrary but internally consistent
/// scale. A token touched by more than one trade keeps the scale set by
/// whichever trade is converted last — harmless here since every trade in
/// one solution already settles at the auction's uniform clearing price for
/// its pair.
fn prices_for(solution: &solution::Solution) -> HashMap<String, String> {
    let mut prices = HashMap::new();
    for trade in &solution.trades {
        prices.insert(trade.sell_token.to_string(), trade.executed_buy.to_string());
        prices.insert(trade.buy_token.to_string(), trade.executed_sell.to_string());
    }
    prices
}

pub fn from_domain(response: solver_core::Response) -> SolveResponseDto {
    SolveResponseDto {
        solutions: response
            .solutions
            .into_iter()
            .map(|solution| SolutionDto {
                id: solution.id,
                prices: prices_for(&solution),
                trades: solution
                    .trades
                    .iter()
                    .map(|t| TradeDto {
                        kind: "fulfillment",
                        order: t.order.clone(),
                        executed_amount: t.executed_sell.to_string(),
                    })
                    .collect(),
                interactions: solution
                    .interactions
                    .iter()
                    .map(|hop| InteractionDto {
                        kind: "liquidity",
                        internalize: false,
                        input_token: hop.token_in,
                        output_token: hop.token_out,
                        input_amount: hop.amount_in.to_string(),
                        output_amount: hop.amount_out.to_string(),
                    })
                    .collect(),
                gas: solution.gas_estimate,
                score: solution.score.0.to_string(),
            })
            .collect(),
    }
}
