//! Correios `CalcPrecoPrazo` price and lead-time client.
//!
//! The calculator answers a GET with an XML document holding one `cServico`
//! element per requested service:
//!
//! ```xml
//! <Servicos>
//!   <cServico>
//!     <Codigo>04510</Codigo>
//!     <Valor>22,80</Valor>
//!     <PrazoEntrega>5</PrazoEntrega>
//!     <Erro>0</Erro>
//!   </cServico>
//! </Servicos>
//! ```

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, instrument};

use vitrine_core::parse_brl;

/// SEDEX (express) service code.
pub const SEDEX: &str = "04014";

/// PAC (economy) service code.
pub const PAC: &str = "04510";

/// Services quoted by default.
pub const DEFAULT_SERVICES: &[&str] = &[SEDEX, PAC];

#[allow(clippy::expect_used)]
static SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<cServico>(.*?)</cServico>").expect("service pattern is valid")
});

/// Errors from the carrier API.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("carrier returned status {0}")]
    Status(u16),

    /// The response body had no readable service blocks.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Package dimensions sent to the carrier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteRequest {
    pub origin: String,
    pub destination: String,
    /// Whole kilograms.
    pub weight_kg: u32,
    pub length_cm: u32,
    pub height_cm: u32,
    pub width_cm: u32,
}

/// One service line from the carrier response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierQuote {
    pub code: String,
    pub price: Decimal,
    pub days: u32,
    /// Carrier error code; empty or `"0"` means success.
    pub error: String,
}

impl CarrierQuote {
    /// A line the storefront can offer: no error code and a positive price.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (self.error.is_empty() || self.error == "0") && self.price > Decimal::ZERO
    }
}

/// Live carrier price lookup.
#[async_trait]
pub trait CarrierQuoter: Send + Sync {
    /// Quote every service in `services` for the given package.
    async fn quote(
        &self,
        request: &QuoteRequest,
        services: &[&str],
    ) -> Result<Vec<CarrierQuote>, CarrierError>;
}

/// HTTP client for the Correios calculator.
#[derive(Clone)]
pub struct CorreiosClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CorreiosClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, request: &QuoteRequest, services: &[&str]) -> Result<url::Url, CarrierError> {
        let weight = request.weight_kg.to_string();
        let length = request.length_cm.to_string();
        let height = request.height_cm.to_string();
        let width = request.width_cm.to_string();
        let services = services.join(",");
        url::Url::parse_with_params(
            &self.endpoint,
            [
                ("nCdEmpresa", ""),
                ("sDsSenha", ""),
                ("sCepOrigem", request.origin.as_str()),
                ("sCepDestino", request.destination.as_str()),
                ("nVlPeso", weight.as_str()),
                ("nCdFormato", "1"),
                ("nVlComprimento", length.as_str()),
                ("nVlAltura", height.as_str()),
                ("nVlLargura", width.as_str()),
                ("sCdMaoPropria", "n"),
                ("nVlValorDeclarado", "0"),
                ("sCdAvisoRecebimento", "n"),
                ("nCdServico", services.as_str()),
                ("nVlDiametro", "0"),
                ("StrRetorno", "xml"),
                ("nIndicaCalculo", "3"),
            ],
        )
        .map_err(|e| CarrierError::Parse(format!("invalid endpoint: {e}")))
    }
}

#[async_trait]
impl CarrierQuoter for CorreiosClient {
    #[instrument(skip(self, request), fields(destination = %request.destination))]
    async fn quote(
        &self,
        request: &QuoteRequest,
        services: &[&str],
    ) -> Result<Vec<CarrierQuote>, CarrierError> {
        let url = self.url(request, services)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CarrierError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let quotes = parse_response(&body)?;
        debug!(count = quotes.len(), "Carrier quotes received");
        Ok(quotes)
    }
}

/// Extract service lines from a calculator XML response.
///
/// Tags are matched as plain text, not parsed as XML: entities and CDATA
/// sections are left undecoded and tags carrying attributes are not found.
/// The calculator emits none of these, so a line written with them reads
/// as missing fields and is dropped as invalid rather than misquoted.
///
/// # Errors
///
/// Returns `CarrierError::Parse` when no `cServico` element is present.
pub fn parse_response(body: &str) -> Result<Vec<CarrierQuote>, CarrierError> {
    let quotes: Vec<CarrierQuote> = SERVICE_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|block| {
            let block = block.as_str();
            CarrierQuote {
                code: tag(block, "Codigo").to_owned(),
                price: parse_brl(tag(block, "Valor")).unwrap_or(Decimal::ZERO),
                days: tag(block, "PrazoEntrega").parse().unwrap_or(0),
                error: tag(block, "Erro").to_owned(),
            }
        })
        .collect();

    if quotes.is_empty() {
        return Err(CarrierError::Parse("no cServico element".to_string()));
    }
    Ok(quotes)
}

/// Text content of the first `<name>...</name>` in `block`, trimmed.
fn tag<'a>(block: &'a str, name: &str) -> &'a str {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    block
        .split_once(open.as_str())
        .and_then(|(_, rest)| rest.split_once(close.as_str()))
        .map_or("", |(value, _)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="ISO-8859-1" ?>
<Servicos>
  <cServico>
    <Codigo>04014</Codigo>
    <Valor>28,50</Valor>
    <PrazoEntrega>1</PrazoEntrega>
    <Erro>0</Erro>
    <MsgErro></MsgErro>
  </cServico>
  <cServico>
    <Codigo>04510</Codigo>
    <Valor>1.022,80</Valor>
    <PrazoEntrega>5</PrazoEntrega>
    <Erro></Erro>
  </cServico>
</Servicos>"#;

    #[test]
    fn test_parse_response() {
        let quotes = parse_response(SAMPLE).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].code, SEDEX);
        assert_eq!(quotes[0].price, Decimal::new(2850, 2));
        assert_eq!(quotes[0].days, 1);
        assert_eq!(quotes[1].price, Decimal::new(102_280, 2));
        assert!(quotes.iter().all(CarrierQuote::is_valid));
    }

    #[test]
    fn test_error_lines_are_invalid() {
        let body = "<cServico><Codigo>04510</Codigo><Valor>0,00</Valor>\
                    <PrazoEntrega>0</PrazoEntrega><Erro>-3</Erro></cServico>";
        let quotes = parse_response(body).unwrap();
        assert!(!quotes[0].is_valid());
    }

    #[test]
    fn test_markup_in_fields_is_not_decoded() {
        let body = "<cServico><Codigo><![CDATA[04510]]></Codigo>\
                    <Valor currency=\"BRL\">22,80</Valor>\
                    <PrazoEntrega>5</PrazoEntrega><Erro>0</Erro></cServico>";
        let quotes = parse_response(body).unwrap();
        assert_eq!(quotes[0].code, "<![CDATA[04510]]>");
        assert_eq!(quotes[0].price, Decimal::ZERO);
        assert!(!quotes[0].is_valid());
    }

    #[test]
    fn test_empty_body_is_parse_error() {
        assert!(matches!(
            parse_response("<html>maintenance</html>"),
            Err(CarrierError::Parse(_))
        ));
    }

    #[test]
    fn test_url_params() {
        let client = CorreiosClient::new("https://carrier.test/calc");
        let request = QuoteRequest {
            origin: "01001000".to_string(),
            destination: "20010000".to_string(),
            weight_kg: 2,
            length_cm: 16,
            height_cm: 8,
            width_cm: 11,
        };
        let url = client.url(&request, DEFAULT_SERVICES).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["sCepDestino"], "20010000");
        assert_eq!(params["nVlPeso"], "2");
        assert_eq!(params["nVlAltura"], "8");
        assert_eq!(params["nCdServico"], "04014,04510");
        assert_eq!(params["StrRetorno"], "xml");
    }
}
