use serde::Serialize;

use super::{
    as_decimal, divide, is_safe_cents, percent_of, round_cents, scale, sum_cents, Cents,
    TariffRates,
};

/// Cargo insurance as a share of the auction price.
pub const INSURANCE_RATE: f64 = 0.015;
/// Indirect-buyer fee charged on every purchase (USD cents).
pub const INDIRECT_BUYER_FEE_USD: Cents = 50_00;
/// Sales tax applied over CIF + DAI + SC.
pub const ISV_RATE: f64 = 0.15;
/// Registration (matrícula IP): 3% of CIF in Lempiras plus a flat L 800.
pub const MATRICULA_CIF_RATE: f64 = 0.03;
pub const MATRICULA_BASE_LPS: Cents = 800_00;
/// International wire transfer fee (USD cents).
pub const WIRE_TRANSFER_FEE_USD: Cents = 71_00;
/// Import-service commission (USD cents).
pub const COMMISSION_USD: Cents = 300_00;

/// Fixed customs fees billed in Lempiras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFeesLps {
    pub servicio_datos: Cents,
    pub dva: Cents,
    pub almacenaje: Cents,
    pub tramite_aduanero: Cents,
    pub tramite_placas: Cents,
}

impl FixedFeesLps {
    pub const CURRENT: FixedFeesLps = FixedFeesLps {
        servicio_datos: 124_00,
        dva: 124_00,
        almacenaje: 6250_00,
        tramite_aduanero: 3250_00,
        tramite_placas: 500_00,
    };

    fn to_usd(self, fx: f64) -> FixedFeesLps {
        FixedFeesLps {
            servicio_datos: divide(self.servicio_datos, fx),
            dva: divide(self.dva, fx),
            almacenaje: divide(self.almacenaje, fx),
            tramite_aduanero: divide(self.tramite_aduanero, fx),
            tramite_placas: divide(self.tramite_placas, fx),
        }
    }
}

/// Every line of an import receipt in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    #[serde(with = "as_decimal")]
    pub price: Cents,
    #[serde(with = "as_decimal")]
    pub grua: Cents,
    #[serde(with = "as_decimal")]
    pub flete: Cents,
    #[serde(with = "as_decimal")]
    pub seguro: Cents,
    #[serde(with = "as_decimal")]
    pub comprador_indirecto: Cents,
    #[serde(with = "as_decimal")]
    pub cif: Cents,
    #[serde(with = "as_decimal")]
    pub dai: Cents,
    #[serde(with = "as_decimal")]
    pub sc: Cents,
    #[serde(with = "as_decimal")]
    pub isv: Cents,
    #[serde(with = "as_decimal")]
    pub ecotasa: Cents,
    #[serde(with = "as_decimal")]
    pub servicio_datos: Cents,
    #[serde(with = "as_decimal")]
    pub dva: Cents,
    #[serde(with = "as_decimal")]
    pub almacenaje: Cents,
    #[serde(with = "as_decimal")]
    pub tramite_aduanero: Cents,
    #[serde(with = "as_decimal")]
    pub tramite_placas: Cents,
    #[serde(rename = "matriculaIP", with = "as_decimal")]
    pub matricula_ip: Cents,
    #[serde(with = "as_decimal")]
    pub transferencia_internacional: Cents,
    #[serde(with = "as_decimal")]
    pub comision: Cents,
}

impl Breakdown {
    pub fn taxes(&self) -> Cents {
        sum_cents(&[self.dai, self.sc, self.isv, self.servicio_datos, self.ecotasa])
    }

    pub fn duties(&self) -> Cents {
        sum_cents(&[
            self.almacenaje,
            self.tramite_aduanero,
            self.tramite_placas,
            self.dva,
            self.matricula_ip,
        ])
    }

    pub fn other_fees(&self) -> Cents {
        sum_cents(&[self.transferencia_internacional, self.comision])
    }

    fn lines(&self) -> [Cents; 18] {
        [
            self.price,
            self.grua,
            self.flete,
            self.seguro,
            self.comprador_indirecto,
            self.cif,
            self.dai,
            self.sc,
            self.isv,
            self.ecotasa,
            self.servicio_datos,
            self.dva,
            self.almacenaje,
            self.tramite_aduanero,
            self.tramite_placas,
            self.matricula_ip,
            self.transferencia_internacional,
            self.comision,
        ]
    }

    /// False when any line saturated or grew past `MAX_SAFE_CENTS`.
    pub fn is_in_range(&self) -> bool {
        self.lines().into_iter().all(is_safe_cents)
    }

    /// Import-side cost only: CIF (and the price inside it) is reported on
    /// its own line and never added here.
    pub fn totals(&self) -> Totals {
        let taxes = self.taxes();
        let duties = self.duties();
        let other_fees = self.other_fees();
        Totals {
            taxes,
            duties,
            other_fees,
            total: sum_cents(&[taxes, duties, other_fees]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[serde(with = "as_decimal")]
    pub taxes: Cents,
    #[serde(with = "as_decimal")]
    pub duties: Cents,
    #[serde(with = "as_decimal")]
    pub other_fees: Cents,
    #[serde(with = "as_decimal")]
    pub total: Cents,
}

impl Totals {
    pub fn is_in_range(&self) -> bool {
        [self.taxes, self.duties, self.other_fees, self.total]
            .into_iter()
            .all(is_safe_cents)
    }
}

/// A value computed in both currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dual<T> {
    pub usd: T,
    pub lps: T,
}

/// Purchase-side amounts for one (port, vehicle type) route, in USD cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCosts {
    pub price: Cents,
    pub grua: Cents,
    pub flete: Cents,
    /// Lempiras per dollar
    pub fx: f64,
}

impl RouteCosts {
    pub fn seguro(&self) -> Cents {
        scale(self.price, INSURANCE_RATE)
    }

    /// Customs valuation base: price + towing + freight + insurance +
    /// indirect-buyer fee.
    pub fn cif(&self) -> Cents {
        sum_cents(&[
            self.price,
            self.grua,
            self.flete,
            self.seguro(),
            INDIRECT_BUYER_FEE_USD,
        ])
    }

    /// Full receipt in both currencies.
    ///
    /// Lines priced in dollars are converted from their rounded USD value;
    /// lines priced in Lempiras (ecotasa, fixed fees, matrícula) are
    /// converted the other way. ISV in Lempiras is taken over the Lempira
    /// CIF, DAI and SC rather than converted.
    pub fn breakdown(&self, rates: TariffRates, eco_tax_lps: Cents) -> Dual<Breakdown> {
        let fx = self.fx;
        let seguro = self.seguro();
        let cif = self.cif();

        let dai = percent_of(cif, rates.dai_pct);
        let sc = percent_of(sum_cents(&[cif, dai]), rates.sc_pct);
        let isv = scale(sum_cents(&[cif, dai, sc]), ISV_RATE);

        let cif_lps = scale(cif, fx);
        let dai_lps = scale(dai, fx);
        let sc_lps = scale(sc, fx);
        let isv_lps = scale(sum_cents(&[cif_lps, dai_lps, sc_lps]), ISV_RATE);

        let fees_lps = FixedFeesLps::CURRENT;
        let fees_usd = fees_lps.to_usd(fx);

        let matricula_lps =
            round_cents(MATRICULA_CIF_RATE * cif as f64 * fx + MATRICULA_BASE_LPS as f64);

        let usd = Breakdown {
            price: self.price,
            grua: self.grua,
            flete: self.flete,
            seguro,
            comprador_indirecto: INDIRECT_BUYER_FEE_USD,
            cif,
            dai,
            sc,
            isv,
            ecotasa: divide(eco_tax_lps, fx),
            servicio_datos: fees_usd.servicio_datos,
            dva: fees_usd.dva,
            almacenaje: fees_usd.almacenaje,
            tramite_aduanero: fees_usd.tramite_aduanero,
            tramite_placas: fees_usd.tramite_placas,
            matricula_ip: divide(matricula_lps, fx),
            transferencia_internacional: WIRE_TRANSFER_FEE_USD,
            comision: COMMISSION_USD,
        };

        let lps = Breakdown {
            price: scale(self.price, fx),
            grua: scale(self.grua, fx),
            flete: scale(self.flete, fx),
            seguro: scale(seguro, fx),
            comprador_indirecto: scale(INDIRECT_BUYER_FEE_USD, fx),
            cif: cif_lps,
            dai: dai_lps,
            sc: sc_lps,
            isv: isv_lps,
            ecotasa: eco_tax_lps,
            servicio_datos: fees_lps.servicio_datos,
            dva: fees_lps.dva,
            almacenaje: fees_lps.almacenaje,
            tramite_aduanero: fees_lps.tramite_aduanero,
            tramite_placas: fees_lps.tramite_placas,
            matricula_ip: matricula_lps,
            transferencia_internacional: scale(WIRE_TRANSFER_FEE_USD, fx),
            comision: scale(COMMISSION_USD, fx),
        };

        Dual { usd, lps }
    }
}
