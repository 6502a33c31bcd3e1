use crate::domain::model::{
    Airport, CountryRegionTable, ForecastInputs, ForecastOutcome, Region,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Resolves a raw airport code (domestic or international) to the airport
/// record, or `None` when the code is unknown.
pub trait AirportDirectory {
    fn lookup(&self, code: &str) -> Option<&Airport>;
}

impl AirportDirectory for std::collections::HashMap<String, Airport> {
    fn lookup(&self, code: &str) -> Option<&Airport> {
        self.get(code)
    }
}

/// Classifies a country code into an international forecast region.
pub trait RegionLookup {
    fn region_of(&self, country_code: i32) -> Option<Region>;
}

impl RegionLookup for CountryRegionTable {
    fn region_of(&self, country_code: i32) -> Option<Region> {
        CountryRegionTable::region_of(self, country_code)
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ForecastInputs>;
    async fn transform(&self, inputs: ForecastInputs) -> Result<ForecastOutcome>;
    async fn load(&self, outcome: ForecastOutcome) -> Result<String>;
}
