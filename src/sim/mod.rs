pub mod groundwater;
