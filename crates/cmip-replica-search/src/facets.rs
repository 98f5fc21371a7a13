// SPDX-License-Identifier: Apache-2.0

//! Facet value lists used to keep each query below the index's response ceiling.

/// One facet and the values to split a query on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetDimension {
    pub name: String,
    pub values: Vec<String>,
}

impl FacetDimension {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

pub const DATA_NODES: &[&str] = &[
    "esg-dn1.nsc.liu.se",
    "esgf-data3.ceda.ac.uk",
    "esgf.bsc.es",
    "esgf3.dkrz.de",
    "esgf-data2.diasjp.net",
    "noresg.nird.sigma2.no",
    "esgf-data.ucar.edu",
    "esg-dn2.nsc.liu.se",
    "crd-esgf-drc.ec.gc.ca",
    "esgf.ichec.ie",
    "esgf-cnr.hpc.cineca.it",
    "esg.lasg.ac.cn",
    "vesg.ipsl.upmc.fr",
    "esg1.umr-cnrm.fr",
    "esgf.nccs.nasa.gov",
    "dpesgf03.nccs.nasa.gov",
    "esgf.nci.org.au",
    "cmip.bcc.cma.cn",
    "esgf-data3.diasjp.net",
    "esgdata.gfdl.noaa.gov",
    "esgf-node2.cmcc.it",
    "dist.nmlab.snu.ac.kr",
    "esgf.dwd.de",
    "esg-cccr.tropmet.res.in",
    "esgf.rcec.sinica.edu.tw",
    "cmip.fio.org.cn",
    "aims3.llnl.gov",
    "cmip.dess.tsinghua.edu.cn",
    "gridftp.ipsl.upmc.fr",
    "esgf-nimscmip6.apcc21.org",
    "esg.camscma.cn",
    "polaris.pknu.ac.kr",
    "esgf-data-fedcheck.ceda.ac.uk",
    "vesgint-data.ipsl.upmc.fr",
    "esgf-node.gfdl.noaa.gov",
    "esgf-data1.llnl.gov",
    "esg-dn1.tropmet.res.in",
    "esgf-data.csc.fi",
    "esgf-data2.llnl.gov",
    "esgf1.dkrz.de",
];

/// The node with the largest retraction volume; the `data-node` chunking splits on it alone.
pub const PRIMARY_DATA_NODE: &str = "esgf-data3.ceda.ac.uk";

pub const FREQUENCIES: &[&str] = &[
    "1hr", "1hrCM", "3hr", "3hrPt", "6hr", "6hrPt", "day", "dec", "fx", "mon", "monC", "monPt",
    "month", "subhrPt", "yr", "yrPt",
];

pub const REALMS: &[&str] = &[
    "aerosol",
    "atmos",
    "atmosChem",
    "land",
    "landIce",
    "ocean",
    "ocnBgChem",
    "ocnBgchem",
    "seaIce",
];

pub const ACTIVITIES: &[&str] = &[
    "AerChemMIP",
    "C4MIP",
    "CFMIP",
    "CMIP",
    "DAMIP",
    "DCPP",
    "HighResMIP",
    "LUMIP",
    "PAMIP",
    "RFMIP",
    "ScenarioMIP",
    "VolMIP",
];

#[must_use]
pub fn frequency_dimension() -> FacetDimension {
    FacetDimension::new("frequency", FREQUENCIES.iter().copied())
}

#[must_use]
pub fn data_node_dimension<I, S>(nodes: I) -> FacetDimension
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FacetDimension::new("data_node", nodes)
}

/// data_node, then frequency, then realm, then activity_id.
#[must_use]
pub fn std3_dimensions(data_nodes: &[String]) -> Vec<FacetDimension> {
    vec![
        data_node_dimension(data_nodes.iter().cloned()),
        frequency_dimension(),
        FacetDimension::new("realm", REALMS.iter().copied()),
        FacetDimension::new("activity_id", ACTIVITIES.iter().copied()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std3_orders_dimensions_from_coarse_to_fine() {
        let nodes: Vec<String> = DATA_NODES.iter().map(|s| s.to_string()).collect();
        let dims = std3_dimensions(&nodes);
        let names: Vec<&str> = dims.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["data_node", "frequency", "realm", "activity_id"]);
        assert_eq!(dims[0].values.len(), 40);
        assert!(DATA_NODES.contains(&PRIMARY_DATA_NODE));
    }
}
