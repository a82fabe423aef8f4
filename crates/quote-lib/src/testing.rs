//! Shared catalog and quote fixtures for unit tests

use crate::catalog::{
    CatalogPrice, CatalogTerm, CatalogType, CustomAxis, CustomPricing, InMemoryCatalog,
};
use crate::models::{Os, Rate, ResourceKind, ResourceRequest};

pub const LOCATION: &str = "eu-west-1";
pub const NO_CO2_LOCATION: &str = "us-east-1";
pub const DYNAMIC_LOCATION: &str = "eu-central-1";

pub fn fixed_type(code: &str, kind: ResourceKind, cpu: f64, ram: f64, gpu: f64) -> CatalogType {
    CatalogType {
        code: code.to_string(),
        kind,
        cpu,
        ram,
        gpu,
        constant: Some(true),
        baseline: None,
        physical: false,
        processor: Some("Intel Xeon".to_string()),
        auto_scale: false,
        edge: false,
        custom: false,
        cpu_rate: Rate::Medium,
        ram_rate: Rate::Medium,
        gpu_rate: Rate::Medium,
        network_rate: Rate::Medium,
        storage_rate: Rate::Medium,
    }
}

pub fn custom_type(code: &str, kind: ResourceKind, cpu: f64, ram: f64) -> CatalogType {
    CatalogType {
        custom: true,
        constant: None,
        processor: None,
        ..fixed_type(code, kind, cpu, ram, 0.0)
    }
}

pub fn term(code: &str, period: f64, initial_cost: bool) -> CatalogTerm {
    CatalogTerm {
        code: code.to_string(),
        period,
        ephemeral: false,
        initial_cost,
        reservation: period > 0.0,
        convertible_os: false,
        convertible_engine: false,
        convertible_type: false,
        convertible_family: false,
        convertible_location: false,
    }
}

pub fn price(code: &str, type_code: &str, term: &str, location: &str, cost: f64) -> CatalogPrice {
    CatalogPrice {
        code: code.to_string(),
        type_code: type_code.to_string(),
        term: term.to_string(),
        location: location.to_string(),
        os: Some(Os::Linux),
        engine: None,
        edition: None,
        cost,
        initial_cost: 0.0,
        co2: 0.0,
        co2_curve: None,
        custom: None,
    }
}

pub fn axis(unit_cost: f64, minimum: f64, increment: f64) -> CustomAxis {
    CustomAxis {
        minimum,
        increment,
        unit_cost,
        co2: 0.0,
        co2_curve: None,
    }
}

/// Base catalog: three fixed instance sizes, a GPU type, a database type,
/// on-demand, one-year upfront and spot terms.
pub fn catalog() -> InMemoryCatalog {
    let spot = CatalogTerm {
        ephemeral: true,
        reservation: false,
        ..term("spot", 0.0, false)
    };

    InMemoryCatalog::new()
        .with_location(LOCATION)
        .with_location(NO_CO2_LOCATION)
        .with_location(DYNAMIC_LOCATION)
        .with_type(fixed_type("t.small", ResourceKind::Instance, 1.0, 2000.0, 0.0))
        .with_type(fixed_type("t.medium", ResourceKind::Instance, 2.0, 4000.0, 0.0))
        .with_type(fixed_type("t.big", ResourceKind::Instance, 16.0, 64000.0, 0.0))
        .with_type(fixed_type("g.gpu", ResourceKind::Instance, 8.0, 32000.0, 1.0))
        .with_type(fixed_type("db.small", ResourceKind::Database, 2.0, 4096.0, 0.0))
        .with_type(custom_type("custom.vm", ResourceKind::Instance, 96.0, 393216.0))
        .with_term(term("on-demand", 0.0, false))
        .with_term(term("1y", 12.0, true))
        .with_term(spot)
        .with_price(CatalogPrice {
            co2: 20.0,
            ..price("small-od", "t.small", "on-demand", LOCATION, 168.0)
        })
        .with_price(CatalogPrice {
            os: Some(Os::Windows),
            co2: 20.0,
            ..price("small-od-win", "t.small", "on-demand", LOCATION, 150.0)
        })
        .with_price(CatalogPrice {
            initial_cost: 1000.0,
            co2: 20.0,
            ..price("small-1y", "t.small", "1y", LOCATION, 50.0)
        })
        .with_price(CatalogPrice {
            co2: 20.0,
            ..price("small-spot", "t.small", "spot", LOCATION, 60.0)
        })
        .with_price(CatalogPrice {
            co2: 10.0,
            ..price("medium-od", "t.medium", "on-demand", LOCATION, 300.0)
        })
        .with_price(CatalogPrice {
            initial_cost: 1500.0,
            co2: 10.0,
            ..price("medium-1y", "t.medium", "1y", LOCATION, 100.0)
        })
        .with_price(CatalogPrice {
            co2: 100.0,
            ..price("big-od", "t.big", "on-demand", LOCATION, 2000.0)
        })
        .with_price(CatalogPrice {
            co2: 80.0,
            ..price("gpu-od", "g.gpu", "on-demand", LOCATION, 900.0)
        })
        .with_price(CatalogPrice {
            os: None,
            engine: Some("MYSQL".to_string()),
            co2: 15.0,
            ..price("db-mysql-od", "db.small", "on-demand", LOCATION, 250.0)
        })
        .with_price(CatalogPrice {
            os: None,
            engine: Some("POSTGRESQL".to_string()),
            co2: 15.0,
            ..price("db-pg-od", "db.small", "on-demand", LOCATION, 270.0)
        })
        .with_price(price("small-od-us", "t.small", "on-demand", NO_CO2_LOCATION, 170.0))
        .with_price(price("medium-od-us", "t.medium", "on-demand", NO_CO2_LOCATION, 320.0))
        .with_price(price("small-od-de", "t.small", "on-demand", DYNAMIC_LOCATION, 168.0))
        .with_price(CatalogPrice {
            custom: Some(CustomPricing {
                cpu: Some(CustomAxis {
                    co2: 2.0,
                    ..axis(20.0, 1.0, 1.0)
                }),
                gpu: None,
                ram: Some(axis(5.0, 1.0, 1.0)),
            }),
            ..price("custom-od-de", "custom.vm", "on-demand", DYNAMIC_LOCATION, 0.0)
        })
}

pub fn request(name: &str, cpu: f64, ram: f64) -> ResourceRequest {
    ResourceRequest::new(name, ResourceKind::Instance, cpu, ram)
}
