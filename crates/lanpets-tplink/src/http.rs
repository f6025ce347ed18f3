//! A thin, synchronous HTTP client for the router's admin UI. Every method
//! blocks; callers run this behind `tokio::task::spawn_blocking`.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::json;

use crate::rsa;

/// Mirrors Python's `urllib.parse.quote` default safe set (`'/'` plus the
/// always-safe letters/digits/`_.-~`), so the URL-encoded `data=` body is
/// byte-identical to what the router's JS frontend sends.
const QUOTE_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

const COMMON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    error_code: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct DhcpClient {
    pub name: String,
    pub macaddr: String,
    pub ipaddr: String,
}

#[derive(Debug, Deserialize)]
pub struct DhcpReservation {
    pub mac: String,
    pub ip: String,
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct TrafficEntry {
    pub addr: String,
    pub rx_bytes: i64,
    pub tx_bytes: i64,
}

pub struct TpLinkSession {
    address: String,
    username: String,
    password: String,
    agent: ureq::Agent,
    stok: Option<String>,
}

impl TpLinkSession {
    pub fn new(address: String, username: String, password: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .cookie_store(ureq::CookieStore::default())
            .build();
        Self { address, username, password, agent, stok: None }
    }

    fn post(&self, path: &str, data: &str, referer: &str) -> Result<serde_json::Value, String> {
        let body = format!("data={}", utf8_percent_encode(data, QUOTE_SAFE));
        let url = format!("http://{}/{path}", self.address);
        let referer_header = format!("http://{}/{referer}", self.address);
        self.agent
            .post(&url)
            .set("accept", COMMON_ACCEPT)
            .set("content-type", "application/x-www-form-urlencoded; charset=UTF-8")
            .set("x-requested-with", "XMLHttpRequest")
            .set("Referer", &referer_header)
            .send_string(&body)
            .map_err(|error| format!("POST {path}: {error}"))?
            .into_json()
            .map_err(|error| format!("decode response from {path}: {error}"))
    }

    fn login(&mut self) -> Result<(), String> {
        let resp = self.post(
            "cgi-bin/luci/;stok=/login?form=login",
            r#"{"method":"get"}"#,
            "webpages/login.html",
        )?;
        let error_code = resp.get("error_code").and_then(|v| v.as_str()).unwrap_or("");
        if error_code != "0" {
            return Err(format!("fetching login key failed: {resp}"));
        }
        let password_field = resp
            .pointer("/result/password")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "login response missing result.password".to_string())?;
        let modulus_hex = password_field.first().and_then(|v| v.as_str()).ok_or("missing modulus")?;
        let exponent_hex = password_field.get(1).and_then(|v| v.as_str()).ok_or("missing exponent")?;

        let modulus = rsa::parse_hex_biguint(modulus_hex)?;
        let exponent = rsa::parse_hex_biguint(exponent_hex)?;
        let ciphertext = rsa::encrypt(self.password.as_bytes(), &modulus, &exponent)?;
        let ciphertext_hex = hex::encode(&ciphertext);

        // The router's login form always expects the literal username
        // "admin" here regardless of the configured account name — this
        // matches the router firmware's own frontend, not a bug.
        let _ = &self.username;
        let data = json!({"method": "login", "params": {"username": "admin", "password": ciphertext_hex}}).to_string();
        let resp = self.post("cgi-bin/luci/;stok=/login?form=login", &data, "webpages/login.html")?;
        let error_code = resp.get("error_code").and_then(|v| v.as_str()).unwrap_or("");
        if error_code != "0" {
            return Err(format!("authentication failed: {resp}"));
        }
        let stok = resp
            .pointer("/result/stok")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "login response missing result.stok".to_string())?;
        self.stok = Some(stok.to_string());
        Ok(())
    }

    fn api_query<T: serde::de::DeserializeOwned>(&mut self, admin_path: &str, data: &str) -> Result<T, String> {
        if self.stok.is_none() {
            self.login()?;
        }
        let stok = self.stok.clone().expect("just populated above");
        let path = format!("cgi-bin/luci/;stok={stok}/admin/{admin_path}");
        let value = self.post(&path, data, "webpages/index.html")?;
        let typed: ApiResponse<T> = serde_json::from_value(value).map_err(|error| format!("decode {admin_path}: {error}"))?;
        if typed.error_code != "0" {
            return Err(format!("{admin_path} returned error_code {}", typed.error_code));
        }
        typed.result.ok_or_else(|| format!("{admin_path} response missing result"))
    }

    pub fn get_dhcp_clients(&mut self) -> Result<Vec<DhcpClient>, String> {
        self.api_query("dhcps?form=client", r#"{"method":"get","params":{}}"#)
    }

    pub fn get_dhcp_static_reservations(&mut self) -> Result<Vec<DhcpReservation>, String> {
        self.api_query("dhcps?form=reservation", r#"{"method":"get","params":{}}"#)
    }

    pub fn get_traffic_stats(&mut self) -> Result<Vec<TrafficEntry>, String> {
        self.api_query("ipstats?form=list", r#"{"method":"get","params":{}}"#)
    }
}
