//! Registry-built adapters driven by the scanner, with fake HTTP and browser backends.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CannedSession, MapFetcher};
use tender_radar::config::{PortalConfig, SectionConfig, StrategyKind};
use tender_radar::portals::AdapterRegistry;
use tender_radar::Scanner;

const AYSA_LISTING: &str = "https://aysa.test/proveedores/licitaciones/obras/";

fn triggers() -> Vec<String> {
    vec![
        "licitación pública".into(),
        "provisión de".into(),
        "concurso de precios".into(),
    ]
}

fn interactive(name: &str, sections: Vec<SectionConfig>) -> PortalConfig {
    let mut p = PortalConfig::static_site(name, &format!("https://{name}"));
    p.strategy = StrategyKind::Interactive;
    p.sections = sections;
    p
}

fn portals() -> Vec<PortalConfig> {
    let mut comprar = PortalConfig::static_site("comprar.test", "https://comprar.test");
    comprar.targets = vec!["".into(), "/PLIEGO/BusquedaPliego.aspx".into()];
    let down = PortalConfig::static_site("down.test", "https://down.test");
    let aysa = interactive(
        "aysa.test",
        vec![
            SectionConfig {
                name: "Obras".into(),
                url: AYSA_LISTING.into(),
            },
            SectionConfig {
                name: "Servicios".into(),
                url: "https://aysa.test/broken/".into(),
            },
        ],
    );
    let opc = interactive("opc.test", vec![]);
    vec![comprar, down, aysa, opc]
}

#[tokio::test]
async fn every_portal_contributes_what_it_can() {
    let fetcher = MapFetcher::default()
        .with("https://comprar.test", "<html><head><title>Comprar</title></head><body><p>Noticias</p></body></html>")
        .with(
            "https://comprar.test/PLIEGO/BusquedaPliego.aspx",
            "<html><body><h1>Licitación Pública 40/2025</h1><script>var x='provisión de';</script></body></html>",
        );
    let session = CannedSession::default().with(
        AYSA_LISTING,
        r#"<table><tbody>
            <tr><td>Abierta</td><td>LPI 1/25</td><td>Provisión de hipoclorito</td><td>01/03 - 20/03</td><td>$ 5.000</td></tr>
            <tr><td>Cerrada</td><td>LP 9/24</td><td>Pintura de oficinas</td><td>10/01</td></tr>
        </tbody></table>"#,
    );
    let session = Arc::new(session);

    let registry = AdapterRegistry::from_configs(&portals(), Arc::new(fetcher), Some(session.clone()));
    assert_eq!(registry.len(), 4);
    let scanner = Scanner::new(registry, Duration::ZERO);
    let out = scanner.scan_all(&portals(), &triggers()).await;

    assert_eq!(out.len(), 2);

    let page = &out[0];
    assert_eq!(page.portal, "comprar.test");
    assert_eq!(page.url, "https://comprar.test/PLIEGO/BusquedaPliego.aspx");
    // Script contents are not visible text.
    assert_eq!(page.matched_triggers, vec!["licitación pública".to_string()]);

    let row = &out[1];
    assert_eq!(row.portal, "aysa.test");
    assert_eq!(row.matched_triggers, vec!["provisión de".to_string()]);
    assert_eq!(row.url, format!("{AYSA_LISTING}#LPI%201/25"));
    assert!(row.text.starts_with("Licitación LPI 1/25: Provisión de hipoclorito."));
    let fields = row.fields.as_ref().unwrap();
    assert_eq!(fields.section.as_deref(), Some("Obras"));
    assert_eq!(fields.budget.as_deref(), Some("$ 5.000"));

    let scripts = session.scripts.lock().unwrap();
    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[0].click_selector.as_deref(), Some("#btnSearch"));
}

#[tokio::test]
async fn interactive_portal_without_session_yields_nothing() {
    let portals = vec![interactive(
        "aysa.test",
        vec![SectionConfig {
            name: "Obras".into(),
            url: AYSA_LISTING.into(),
        }],
    )];
    let registry = AdapterRegistry::from_configs(&portals, Arc::new(MapFetcher::default()), None);
    let out = Scanner::new(registry, Duration::ZERO)
        .scan_all(&portals, &triggers())
        .await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn portal_without_adapter_is_skipped() {
    let scanner = Scanner::new(AdapterRegistry::new(), Duration::ZERO);
    let out = scanner
        .scan_all(&[PortalConfig::static_site("x.test", "https://x.test")], &triggers())
        .await;
    assert!(out.is_empty());
}

#[tokio::test(start_paused = true)]
async fn delay_applies_between_enabled_portals_only() {
    let portals = vec![
        PortalConfig::static_site("a.test", "https://a.test"),
        PortalConfig::static_site("b.test", "https://b.test"),
        PortalConfig::static_site("c.test", "https://c.test"),
    ];
    let registry = AdapterRegistry::from_configs(&portals, Arc::new(MapFetcher::default()), None);
    let scanner = Scanner::new(registry, Duration::from_secs(2));

    let started = tokio::time::Instant::now();
    scanner.scan_all(&portals, &triggers()).await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(4) && waited < Duration::from_secs(5), "{waited:?}");
}
