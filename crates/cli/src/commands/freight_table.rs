//! Live carrier rate table for every state capital.
//!
//! Used to refresh the contingency rates: quotes a 1 kg, 20x10x20 cm box
//! from the origin postal code to each capital and prints PAC and SEDEX.
//! A failed state prints `---`.
//!
//! # Environment Variables
//!
//! - `SHIPPING_ORIGIN_CEP` - Origin postal code (default: 01001000)
//! - `CORREIOS_URL` - Calculator endpoint

use rust_decimal::Decimal;

use vitrine_core::StateCode;
use vitrine_server::config::CORREIOS_URL;
use vitrine_server::services::shipping::{
    CarrierError, CarrierQuote, CarrierQuoter, CorreiosClient, DEFAULT_SERVICES, PAC,
    QuoteRequest, SEDEX,
};

const DEFAULT_ORIGIN: &str = "01001000";

/// Capital postal code and name per state.
const CAPITALS: [(StateCode, &str, &str); 27] = [
    (StateCode::Ac, "69900001", "Rio Branco"),
    (StateCode::Al, "57020000", "Maceió"),
    (StateCode::Ap, "68900000", "Macapá"),
    (StateCode::Am, "69010000", "Manaus"),
    (StateCode::Ba, "40020000", "Salvador"),
    (StateCode::Ce, "60025000", "Fortaleza"),
    (StateCode::Df, "70040000", "Brasília"),
    (StateCode::Es, "29010000", "Vitória"),
    (StateCode::Go, "74000000", "Goiânia"),
    (StateCode::Ma, "65010000", "São Luís"),
    (StateCode::Mt, "78005000", "Cuiabá"),
    (StateCode::Ms, "79002000", "Campo Grande"),
    (StateCode::Mg, "30110000", "Belo Horizonte"),
    (StateCode::Pa, "66010000", "Belém"),
    (StateCode::Pb, "58010000", "João Pessoa"),
    (StateCode::Pr, "80010000", "Curitiba"),
    (StateCode::Pe, "50010000", "Recife"),
    (StateCode::Pi, "64000000", "Teresina"),
    (StateCode::Rj, "20010000", "Rio de Janeiro"),
    (StateCode::Rn, "59010000", "Natal"),
    (StateCode::Rs, "90010000", "Porto Alegre"),
    (StateCode::Ro, "76801000", "Porto Velho"),
    (StateCode::Rr, "69301000", "Boa Vista"),
    (StateCode::Sc, "88010000", "Florianópolis"),
    (StateCode::Sp, "01001000", "São Paulo"),
    (StateCode::Se, "49010000", "Aracaju"),
    (StateCode::To, "77001000", "Palmas"),
];

/// Query every capital and print the table.
pub async fn run() {
    let origin = super::env_var("SHIPPING_ORIGIN_CEP").unwrap_or_else(|| DEFAULT_ORIGIN.to_owned());
    let endpoint = super::env_var("CORREIOS_URL").unwrap_or_else(|| CORREIOS_URL.to_owned());
    let client = CorreiosClient::new(endpoint);

    print_line(&header());
    for (state, cep, city) in CAPITALS {
        let request = QuoteRequest {
            origin: origin.clone(),
            destination: cep.to_owned(),
            weight_kg: 1,
            length_cm: 20,
            height_cm: 10,
            width_cm: 20,
        };
        let quotes = client.quote(&request, DEFAULT_SERVICES).await;
        if let Err(e) = &quotes {
            tracing::warn!(%state, error = %e, "Carrier quote failed");
        }
        print_line(&row(state, city, &quotes));
    }
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}

fn header() -> String {
    format!(
        "{:<6} | {:<15} | {:>9} | {:>9}\n{}",
        "STATE",
        "CAPITAL",
        "PAC (R$)",
        "SEDEX (R$)",
        "-------|-----------------|-----------|-----------"
    )
}

/// One table line; services missing or in error print `---`.
fn row(state: StateCode, city: &str, quotes: &Result<Vec<CarrierQuote>, CarrierError>) -> String {
    let price = |code: &str| {
        quotes
            .as_ref()
            .ok()
            .and_then(|quotes| quotes.iter().find(|q| q.code == code && q.is_valid()))
            .map_or_else(|| "---".to_owned(), |q| brl(q.price))
    };
    format!(
        "{:<6} | {:<15} | {:>9} | {:>9}",
        state.code(),
        city,
        price(PAC),
        price(SEDEX)
    )
}

/// `28,50` style amount.
fn brl(amount: Decimal) -> String {
    format!("{amount:.2}").replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(code: &str, cents: i64, error: &str) -> CarrierQuote {
        CarrierQuote {
            code: code.to_owned(),
            price: Decimal::new(cents, 2),
            days: 3,
            error: error.to_owned(),
        }
    }

    #[test]
    fn test_row_with_both_services() {
        let quotes = Ok(vec![quote(SEDEX, 4290, "0"), quote(PAC, 2640, "0")]);
        let line = row(StateCode::Rj, "Rio de Janeiro", &quotes);
        assert!(line.starts_with("RJ "));
        assert!(line.contains("26,40"));
        assert!(line.ends_with("42,90"));
    }

    #[test]
    fn test_row_marks_failures() {
        let quotes = Ok(vec![quote(SEDEX, 0, "-3"), quote(PAC, 2280, "")]);
        let line = row(StateCode::Sp, "São Paulo", &quotes);
        assert!(line.contains("22,80"));
        assert!(line.ends_with("---"));

        let failed = Err(CarrierError::Status(503));
        let line = row(StateCode::Ac, "Rio Branco", &failed);
        assert_eq!(line.matches("---").count(), 2);
    }

    #[test]
    fn test_capitals_cover_every_state() {
        for state in StateCode::ALL {
            assert!(CAPITALS.iter().any(|(s, _, _)| *s == state), "{state}");
        }
    }

    #[test]
    fn test_brl_format() {
        assert_eq!(brl(Decimal::new(102_280, 2)), "1022,80");
        assert_eq!(brl(Decimal::new(5, 0)), "5,00");
    }
}
