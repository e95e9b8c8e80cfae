mod dap_client_test;
mod navigator_test;
