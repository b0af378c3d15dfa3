//! Contract ABIs used by the orchestrator and call encoding helpers

use crate::error::{SwapError, SwapResult};

use ethers::abi::{parse_abi, Abi, Function, Token as AbiToken};
use ethers::types::{Bytes, U256};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref ERC20: Abi = parse_abi(&[
        "function approve(address spender, uint256 amount) external returns (bool)",
        "function allowance(address owner, address spender) external view returns (uint256)",
        "function balanceOf(address owner) external view returns (uint256)",
        "function decimals() external view returns (uint8)",
        "function symbol() external view returns (string)",
        "function name() external view returns (string)",
    ])
    .expect("valid ERC20 ABI");

    pub static ref WRAPPED_NATIVE: Abi = parse_abi(&[
        "function deposit() external payable",
        "function withdraw(uint256 wad) external",
    ])
    .expect("valid wrapped native ABI");

    pub static ref ROUTER: Abi = parse_abi(&[
        "function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) external payable",
        "function swapETHForExactTokens(uint256 amountOut, address[] path, address to, uint256 deadline) external payable returns (uint256[] amounts)",
        "function swapExactTokensForETHSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external",
        "function swapTokensForExactETH(uint256 amountOut, uint256 amountInMax, address[] path, address to, uint256 deadline) external returns (uint256[] amounts)",
        "function swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external",
        "function swapTokensForExactTokens(uint256 amountOut, uint256 amountInMax, address[] path, address to, uint256 deadline) external returns (uint256[] amounts)",
    ])
    .expect("valid router ABI");

    pub static ref BRIDGE: Abi = parse_abi(&[
        "function bridgeTokens(address token, uint256 amount) external",
        "function bridgeETH() external payable",
        "function platformFee() external view returns (uint256)",
    ])
    .expect("valid bridge ABI");

    pub static ref OMNIBRIDGE: Abi = parse_abi(&[
        "function minPerTx(address token) external view returns (uint256)",
    ])
    .expect("valid omnibridge ABI");
}

fn function<'a>(abi: &'a Abi, name: &str) -> SwapResult<&'a Function> {
    abi.function(name)
        .map_err(|e| SwapError::Contract(format!("{}: {}", name, e)))
}

/// Encode calldata (selector + arguments)
pub fn encode_call(abi: &Abi, name: &str, args: &[AbiToken]) -> SwapResult<Bytes> {
    function(abi, name)?
        .encode_input(args)
        .map(Bytes::from)
        .map_err(|e| SwapError::Contract(format!("encode {}: {}", name, e)))
}

/// Four-byte selector of a function
pub fn selector(abi: &Abi, name: &str) -> SwapResult<[u8; 4]> {
    Ok(function(abi, name)?.short_signature())
}

/// Decode arguments from calldata that still carries its selector
pub fn decode_call(abi: &Abi, name: &str, data: &[u8]) -> SwapResult<Vec<AbiToken>> {
    if data.len() < 4 {
        return Err(SwapError::Contract(format!("calldata for {} too short", name)));
    }
    function(abi, name)?
        .decode_input(&data[4..])
        .map_err(|e| SwapError::Contract(format!("decode {} input: {}", name, e)))
}

/// Decode the outputs of a read call
pub fn decode_output(abi: &Abi, name: &str, data: &[u8]) -> SwapResult<Vec<AbiToken>> {
    function(abi, name)?
        .decode_output(data)
        .map_err(|e| SwapError::Contract(format!("decode {} output: {}", name, e)))
}

pub fn decode_uint(abi: &Abi, name: &str, data: &[u8]) -> SwapResult<U256> {
    decode_output(abi, name, data)?
        .into_iter()
        .next()
        .and_then(AbiToken::into_uint)
        .ok_or_else(|| SwapError::Contract(format!("{} returned no uint", name)))
}

pub fn decode_string(abi: &Abi, name: &str, data: &[u8]) -> SwapResult<String> {
    decode_output(abi, name, data)?
        .into_iter()
        .next()
        .and_then(AbiToken::into_string)
        .ok_or_else(|| SwapError::Contract(format!("{} returned no string", name)))
}
